// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/model.rs - 模型
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

use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn postprocess(output: &[f32]) -> Result<Self::Output, Self::Error>;
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Option<Self>;
}

/// 类别数量
pub const CATEGORY_NUM: usize = 10;

/// 涂鸦类别，顺序与模型输出一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoodleLabel {
  Apple,
  Bird,
  Cat,
  Clock,
  Computer,
  Eyeglasses,
  Fish,
  IceCream,
  Moon,
  Tree,
}

impl DoodleLabel {
  pub const ALL: [DoodleLabel; CATEGORY_NUM] = [
    DoodleLabel::Apple,
    DoodleLabel::Bird,
    DoodleLabel::Cat,
    DoodleLabel::Clock,
    DoodleLabel::Computer,
    DoodleLabel::Eyeglasses,
    DoodleLabel::Fish,
    DoodleLabel::IceCream,
    DoodleLabel::Moon,
    DoodleLabel::Tree,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DoodleLabel::Apple => "apple",
      DoodleLabel::Bird => "bird",
      DoodleLabel::Cat => "cat",
      DoodleLabel::Clock => "clock",
      DoodleLabel::Computer => "computer",
      DoodleLabel::Eyeglasses => "eyeglasses",
      DoodleLabel::Fish => "fish",
      DoodleLabel::IceCream => "ice_cream",
      DoodleLabel::Moon => "moon",
      DoodleLabel::Tree => "tree",
    }
  }

  /// 图表中该类别的颜色 (RGBA)
  pub fn color(&self) -> [u8; 4] {
    match self {
      DoodleLabel::Apple => [245, 39, 39, 204],
      DoodleLabel::Bird => [254, 255, 131, 204],
      DoodleLabel::Cat => [90, 90, 90, 204],
      DoodleLabel::Clock => [255, 169, 99, 204],
      DoodleLabel::Computer => [255, 127, 224, 204],
      DoodleLabel::Eyeglasses => [127, 206, 255, 204],
      DoodleLabel::Fish => [127, 168, 255, 204],
      DoodleLabel::IceCream => [80, 42, 42, 204],
      DoodleLabel::Moon => [228, 228, 228, 204],
      DoodleLabel::Tree => [135, 255, 129, 204],
    }
  }
}

impl WithLabel for DoodleLabel {
  fn to_label_str(&self) -> String {
    self.as_str().to_string()
  }

  fn to_label_id(&self) -> u32 {
    *self as u32
  }

  fn from_label_id(id: u32) -> Option<Self> {
    Self::ALL.get(id as usize).copied()
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
  #[error("模型输出数量不匹配: 期望 {expected}, 实际 {actual}")]
  OutputShape { expected: usize, actual: usize },
}

/// 每个类别 0-100 的置信度百分比，顺序同 [`DoodleLabel::ALL`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PredictionVector([u8; CATEGORY_NUM]);

impl PredictionVector {
  /// 全零向量，对应空白画布或清空后的状态
  pub const ZERO: PredictionVector = PredictionVector([0; CATEGORY_NUM]);

  pub fn new(scores: [u8; CATEGORY_NUM]) -> Self {
    Self(scores.map(|s| s.min(100)))
  }

  /// 乘以 100 后四舍五入（远离零取整），并截断到 [0, 100]
  pub fn from_raw(raw: &[f32]) -> Result<Self, ModelError> {
    if raw.len() != CATEGORY_NUM {
      return Err(ModelError::OutputShape {
        expected: CATEGORY_NUM,
        actual: raw.len(),
      });
    }

    let mut scores = [0u8; CATEGORY_NUM];
    for (score, value) in scores.iter_mut().zip(raw) {
      *score = to_percentage(*value);
    }
    Ok(Self(scores))
  }

  pub fn scores(&self) -> &[u8; CATEGORY_NUM] {
    &self.0
  }

  pub fn get(&self, label: DoodleLabel) -> u8 {
    self.0[label as usize]
  }

  pub fn is_zero(&self) -> bool {
    self.0.iter().all(|s| *s == 0)
  }

  pub fn labelled(&self) -> impl Iterator<Item = (DoodleLabel, u8)> + '_ {
    DoodleLabel::ALL.iter().copied().zip(self.0.iter().copied())
  }

  /// 得分最高的类别；全零时返回 `None`，并列时取靠前的类别
  pub fn top(&self) -> Option<(DoodleLabel, u8)> {
    self
      .labelled()
      .filter(|(_, s)| *s > 0)
      .fold(None, |best, (label, score)| match best {
        Some((_, best_score)) if best_score >= score => best,
        _ => Some((label, score)),
      })
  }
}

impl Serialize for PredictionVector {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(CATEGORY_NUM))?;
    for (label, score) in self.labelled() {
      map.serialize_entry(label.as_str(), &score)?;
    }
    map.end()
  }
}

fn to_percentage(value: f32) -> u8 {
  if value.is_nan() {
    return 0;
  }
  (value * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxClassifier, OnnxClassifierBuilder, OnnxClassifierError};
