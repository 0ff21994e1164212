// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Datelike, Utc};
use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{PredictionVector, WithLabel},
  output::{Render, draw::Chart},
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 写在图像旁边的 JSON 记录
#[derive(Serialize)]
struct Record<'a> {
  top: Option<String>,
  scores: &'a PredictionVector,
}

impl<'a> Record<'a> {
  fn new(result: &'a PredictionVector, label_with_name: bool) -> Self {
    let top = result.top().map(|(label, _)| {
      if label_with_name {
        label.to_label_str()
      } else {
        label.to_label_id().to_string()
      }
    });
    Self {
      top,
      scores: result,
    }
  }

  fn save(&self, path: &Path) -> Result<(), DirectoryRecordOutputError> {
    std::fs::write(path.with_extension("json"), serde_json::to_string_pretty(self)?)?;
    Ok(())
  }
}

pub enum DrawWrapper {
  /// 保存草图与柱状图的拼图
  Draw(Box<Chart>),
  /// 保存原始草图，另写一份 JSON 记录
  Record { label_with_name: bool },
}

impl DrawWrapper {
  pub fn save_result(
    &self,
    path: &Path,
    frame: &RgbaImage,
    result: &PredictionVector,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(chart) => {
        chart.compose(frame, result).save(path)?;
      }
      DrawWrapper::Record { label_with_name } => {
        frame.save(path)?;
        Record::new(result, *label_with_name).save(path)?;
      }
    };

    Ok(())
  }

  pub fn with(kind: &str) -> Self {
    match kind {
      "record-name" => DrawWrapper::Record {
        label_with_name: true,
      },
      "record-id" => DrawWrapper::Record {
        label_with_name: false,
      },
      _ => DrawWrapper::Draw(Box::default()),
    }
  }
}

/// `folder:///dir[?record[=id]][&always]`
///
/// 每次渲染写入 `<dir>/YYYY/MM/DD/HH-MM-SS-XXXX.png`；
/// 默认跳过全零结果，带 `always` 时全部保存。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let kind = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map(|(_, v)| if v == "id" { "record-id" } else { "record-name" })
      .unwrap_or("draw");

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(url_path(uri)),
      draw: DrawWrapper::with(kind),
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<RgbaImage, PredictionVector> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbaImage, result: &PredictionVector) -> Result<(), Self::Error> {
    if !self.always && result.is_zero() {
      debug!("全零结果，跳过记录");
      return Ok(());
    }

    let path = self.frame_path(Utc::now())?;
    self.draw.save_result(&path, frame, result)?;
    debug!("记录结果到: {}", path.display());
    Ok(())
  }
}
