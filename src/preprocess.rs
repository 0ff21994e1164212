// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/preprocess.rs - 草图预处理流水线
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

//! 画布快照 -> 墨迹包围盒 -> 裁剪 -> 单通道双线性缩放 -> 归一化张量

use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

use crate::frame::{FrameError, MODEL_INPUT_SIZE, ModelInput};

mod bounding_box;
mod crop;
mod resize;

pub use self::bounding_box::{BoundingBox, DEFAULT_TOLERANCE, InkRule, find_ink_bounds};
pub use self::crop::{CropError, crop, restore_onto};
pub use self::resize::{GrayChannel, normalize, resize_bilinear, to_single_channel};

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("裁剪错误: {0}")]
  CropError(#[from] CropError),
  #[error("张量错误: {0}")]
  FrameError(#[from] FrameError),
}

/// 预处理配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
  /// 墨迹像素判定规则
  pub ink_rule: InkRule,
  /// 取哪个通道作为单通道输入
  pub channel: GrayChannel,
  /// 是否先按包围盒裁剪
  pub crop: bool,
}

impl Default for PreprocessConfig {
  fn default() -> Self {
    Self {
      ink_rule: InkRule::NonWhite,
      channel: GrayChannel::Red,
      crop: true,
    }
  }
}

/// 预处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum Preprocessed {
  /// 画布上没有任何墨迹，不需要推理
  Blank,
  /// 可以送入模型的张量，`region` 为参与缩放的原图区域
  Ready {
    region: BoundingBox,
    tensor: ModelInput,
  },
}

impl Preprocessed {
  pub fn is_blank(&self) -> bool {
    matches!(self, Preprocessed::Blank)
  }
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
  config: PreprocessConfig,
}

impl Preprocessor {
  pub fn new(config: PreprocessConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PreprocessConfig {
    &self.config
  }

  pub fn run(&self, image: &RgbaImage) -> Result<Preprocessed, PreprocessError> {
    let Some(bbox) = find_ink_bounds(image, self.config.ink_rule) else {
      debug!("画布为空白，跳过预处理");
      return Ok(Preprocessed::Blank);
    };
    debug!("墨迹包围盒: {:?}", bbox);

    let region = if self.config.crop {
      bbox
    } else {
      BoundingBox::covering(image.width(), image.height())
    };

    let cropped = crop(image, &region)?;
    let tensor = normalize::<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE>(&cropped, self.config.channel)?;
    debug!(
      "预处理完成: {}x{} -> {:?}",
      cropped.width(),
      cropped.height(),
      tensor.shape()
    );

    Ok(Preprocessed::Ready { region, tensor })
  }
}
