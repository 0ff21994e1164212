// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use image::RgbaImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DoodleLabel, PredictionVector},
  output::Render,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// `log://`：把每个类别的得分写入日志
pub struct LogOutput {
  bars: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    // log://?plain 关闭文本柱状条
    let bars = !uri.query_pairs().any(|(k, _)| k == "plain");
    Ok(LogOutput { bars })
  }
}

impl LogOutput {
  pub fn format_line(&self, label: DoodleLabel, score: u8) -> String {
    if self.bars {
      // 每 5 分一格
      let bar = "#".repeat(score as usize / 5);
      format!("{:<10} {:>3} {}", label.as_str(), score, bar)
    } else {
      format!("{:<10} {:>3}", label.as_str(), score)
    }
  }
}

impl Render<RgbaImage, PredictionVector> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &RgbaImage, result: &PredictionVector) -> Result<(), Self::Error> {
    match result.top() {
      Some((label, score)) => info!(
        "识别结果 ({}x{}): {} ({})",
        frame.width(),
        frame.height(),
        label.as_str(),
        score
      ),
      None => info!("识别结果 ({}x{}): 空白画布", frame.width(), frame.height()),
    }
    for (label, score) in result.labelled() {
      info!("  {}", self.format_line(label, score));
    }
    Ok(())
  }
}
