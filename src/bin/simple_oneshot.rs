// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张草图识别
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use tuya::{
  FromUrl,
  args::PreprocessArgs,
  input::InputWrapper,
  model::OnnxClassifierBuilder,
  output::OutputWrapper,
  preprocess::Preprocessor,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Tuya 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径 (onnx:///path/model.onnx)
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 草图来源 (image:///path.png 或 strokes:///path.json)
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径 (log://, image:///path.png, folder:///dir)
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,

  #[command(flatten)]
  pub preprocess: PreprocessArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let model = OnnxClassifierBuilder::from_url(&args.model)?.build()?;
  let output = OutputWrapper::from_url(&args.output)?;
  let preprocessor = Preprocessor::new((&args.preprocess).into());

  OneShotTask::new(preprocessor).run_task(input, model, output)?;

  Ok(())
}
