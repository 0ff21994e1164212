// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/frame.rs - NHWC 张量帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

const GRAY_CHANNELS: usize = 1;
const BATCH: usize = 1;

/// 分类模型的输入边长
pub const MODEL_INPUT_SIZE: u32 = 256;

/// 分类模型期望的输入张量：(1, 256, 256, 1)
pub type ModelInput = GrayNhwcTensor<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE>;

pub trait AsNhwcTensor<const W: u32, const H: u32> {
  fn as_nhwc(&self) -> &[f32];
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 单通道、批大小为 1 的 NHWC 浮点张量，数值范围 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct GrayNhwcTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> GrayNhwcTensor<W, H> {
  pub const LEN: usize = BATCH * (H as usize) * (W as usize) * GRAY_CHANNELS;

  pub fn batch(&self) -> usize {
    BATCH
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    GRAY_CHANNELS
  }

  /// 张量形状 (N, H, W, C)
  pub fn shape(&self) -> [usize; 4] {
    [self.batch(), self.height(), self.width(), self.channels()]
  }

  pub fn get(&self, x: u32, y: u32) -> Option<f32> {
    if x >= W || y >= H {
      return None;
    }
    self.data.get((y as usize) * (W as usize) + x as usize).copied()
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for GrayNhwcTensor<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(FrameError::LengthMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for GrayNhwcTensor<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0f32; Self::LEN].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for GrayNhwcTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsNhwcTensor<W, H> for GrayNhwcTensor<W, H> {
  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}
