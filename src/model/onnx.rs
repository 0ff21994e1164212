// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/model/onnx.rs - ONNX 涂鸦分类模型
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
use tracing::{debug, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNhwcTensor, MODEL_INPUT_SIZE, ModelInput},
  model::{Model, ModelError, PredictionVector},
  url_path,
};

pub struct OnnxClassifier {
  plan: TypedRunnableModel<TypedModel>,
}

#[derive(Error, Debug)]
pub enum OnnxClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, String),
  #[error("推理错误: {0}")]
  InferError(String),
  #[error("模型输出错误: {0}")]
  OutputError(#[from] ModelError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<std::io::Error> for OnnxClassifierError {
  fn from(err: std::io::Error) -> Self {
    OnnxClassifierError::ModelLoadError(err)
  }
}

impl OnnxClassifierError {
  pub fn invalid(msg: &str, e: TractError) -> Self {
    OnnxClassifierError::ModelInvalid(msg.to_string(), format!("{e:#}"))
  }
}

pub struct OnnxClassifierBuilder {
  model_path: String,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = OnnxClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(OnnxClassifierBuilder {
      model_path: url_path(url),
    })
  }
}

impl OnnxClassifierBuilder {
  pub fn model_path(&self) -> &str {
    &self.model_path
  }

  pub fn build(self) -> Result<OnnxClassifier, OnnxClassifierError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let size = MODEL_INPUT_SIZE as usize;
    let plan = tract_onnx::onnx()
      .model_for_read(&mut model_data.as_slice())
      .map_err(|e| OnnxClassifierError::invalid("无法解析 ONNX 模型", e))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 1)),
      )
      .map_err(|e| OnnxClassifierError::invalid("无法设置模型输入形状", e))?
      .into_optimized()
      .map_err(|e| OnnxClassifierError::invalid("无法优化模型", e))?
      .into_runnable()
      .map_err(|e| OnnxClassifierError::invalid("无法构建可运行模型", e))?;
    info!("模型加载完成");

    Ok(OnnxClassifier { plan })
  }
}

impl Model for OnnxClassifier {
  type Input = ModelInput;
  type Output = PredictionVector;
  type Error = OnnxClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入: {:?}", input.shape());
    let tensor = tract_ndarray::Array4::from_shape_vec(
      (input.batch(), input.height(), input.width(), input.channels()),
      input.as_nhwc().to_vec(),
    )
    .map_err(|e| OnnxClassifierError::InferError(e.to_string()))?
    .into_tensor();

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(|e| OnnxClassifierError::InferError(format!("{e:#}")))?;

    let output = outputs
      .first()
      .ok_or_else(|| OnnxClassifierError::InferError("模型没有输出".to_string()))?;
    let scores = output
      .to_array_view::<f32>()
      .map_err(|e| OnnxClassifierError::InferError(format!("{e:#}")))?;
    let raw: Vec<f32> = scores.iter().copied().collect();
    debug!("模型原始输出: {:?}", raw);

    Self::postprocess(&raw)
  }

  fn postprocess(output: &[f32]) -> Result<Self::Output, Self::Error> {
    Ok(PredictionVector::from_raw(output)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_requires_onnx_scheme() {
    let url = Url::parse("tflite:///models/doodle.onnx").unwrap();
    assert!(matches!(
      OnnxClassifierBuilder::from_url(&url),
      Err(OnnxClassifierError::ModelPathError(_))
    ));

    let url = Url::parse("onnx:///models/doodle%20v2.onnx").unwrap();
    let builder = OnnxClassifierBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), "/models/doodle v2.onnx");
  }

  #[test]
  fn missing_model_file_is_a_load_error() {
    let url = Url::parse("onnx:///definitely/not/here.onnx").unwrap();
    let result = OnnxClassifierBuilder::from_url(&url).unwrap().build();
    assert!(matches!(result, Err(OnnxClassifierError::ModelLoadError(_))));
  }

  #[test]
  fn postprocess_flattens_batch_output() {
    let raw = [0.05, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.95];
    let prediction = OnnxClassifier::postprocess(&raw).unwrap();
    assert_eq!(prediction.scores()[9], 95);
  }
}
