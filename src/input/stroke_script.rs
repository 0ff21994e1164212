// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/input/stroke_script.rs - 笔画脚本输入
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

//! 笔画脚本是一份记录了鼠标/触摸事件的 JSON：
//!
//! ```json
//! {
//!   "canvas": { "width": 400, "height": 400 },
//!   "viewport": { "left": 8, "top": 64, "width": 200, "height": 200 },
//!   "line_width": 4,
//!   "events": [
//!     { "type": "down", "x": 20, "y": 30 },
//!     { "type": "move", "x": 80, "y": 90 },
//!     { "type": "up" },
//!     { "type": "touch_start", "touches": [{ "x": 50, "y": 50 }] },
//!     { "type": "touch_move", "touches": [{ "x": 60, "y": 70 }] },
//!     { "type": "touch_end" },
//!     { "type": "clear" }
//!   ]
//! }
//! ```
//!
//! 给出 `viewport` 时事件坐标按页面坐标换算，否则视为画布坐标。

use image::RgbaImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  canvas::{
    Canvas, CanvasError, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, Point, StrokeStyle,
    Viewport,
  },
  url_path,
};

#[derive(Error, Debug)]
pub enum StrokeScriptInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("脚本格式错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("画布错误: {0}")]
  CanvasError(#[from] CanvasError),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptCanvas {
  pub width: u32,
  pub height: u32,
}

impl Default for ScriptCanvas {
  fn default() -> Self {
    Self {
      width: DEFAULT_CANVAS_WIDTH,
      height: DEFAULT_CANVAS_HEIGHT,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptViewport {
  pub left: f32,
  pub top: f32,
  pub width: f32,
  pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
  Down { x: f32, y: f32 },
  Move { x: f32, y: f32 },
  Up,
  TouchStart { touches: Vec<Point> },
  TouchMove { touches: Vec<Point> },
  TouchEnd,
  Clear,
}

/// 换算到画布坐标后的事件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
  Down(Point),
  Move(Point),
  Up,
  Clear,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StrokeScript {
  #[serde(default)]
  pub canvas: ScriptCanvas,
  #[serde(default)]
  pub viewport: Option<ScriptViewport>,
  #[serde(default)]
  pub line_width: Option<f32>,
  pub events: Vec<ScriptEvent>,
}

impl StrokeScript {
  pub fn from_json(text: &str) -> Result<Self, StrokeScriptInputError> {
    Ok(serde_json::from_str(text)?)
  }

  pub fn new_canvas(&self) -> Result<Canvas, CanvasError> {
    let mut style = StrokeStyle::default();
    if let Some(line_width) = self.line_width {
      style.line_width = line_width;
    }
    Ok(Canvas::new(self.canvas.width, self.canvas.height)?.with_style(style))
  }

  fn viewport(&self) -> Result<Viewport, CanvasError> {
    let ScriptCanvas { width, height } = self.canvas;
    match self.viewport {
      Some(v) => Viewport::new(v.left, v.top, v.width, v.height, width, height),
      None => Viewport::new(0.0, 0.0, width as f32, height as f32, width, height),
    }
  }

  /// 把脚本事件换算成画布坐标下的指针事件；没有触点的触摸事件被丢弃
  pub fn pointer_events(&self) -> Result<Vec<PointerEvent>, CanvasError> {
    let viewport = self.viewport()?;
    let events = self
      .events
      .iter()
      .filter_map(|event| match event {
        ScriptEvent::Down { x, y } => Some(PointerEvent::Down(viewport.to_canvas(*x, *y))),
        ScriptEvent::Move { x, y } => Some(PointerEvent::Move(viewport.to_canvas(*x, *y))),
        ScriptEvent::TouchStart { touches } => {
          viewport.touch_to_canvas(touches).map(PointerEvent::Down)
        }
        ScriptEvent::TouchMove { touches } => {
          viewport.touch_to_canvas(touches).map(PointerEvent::Move)
        }
        ScriptEvent::Up | ScriptEvent::TouchEnd => Some(PointerEvent::Up),
        ScriptEvent::Clear => Some(PointerEvent::Clear),
      })
      .collect();
    Ok(events)
  }

  /// 在新画布上回放全部事件，返回最终画面
  pub fn render(&self) -> Result<RgbaImage, StrokeScriptInputError> {
    let mut canvas = self.new_canvas()?;
    for event in self.pointer_events()? {
      match event {
        PointerEvent::Down(at) => canvas.begin_stroke(at),
        PointerEvent::Move(to) => canvas.line_to(to),
        PointerEvent::Up => canvas.end_stroke(),
        PointerEvent::Clear => canvas.clear(),
      }
    }
    Ok(canvas.snapshot())
  }
}

/// 从 `strokes:///path.json` 读取笔画脚本；构造时即回放成画面
pub struct StrokeScriptInput {
  script: StrokeScript,
  image: Option<RgbaImage>,
}

impl FromUrlWithScheme for StrokeScriptInput {
  const SCHEME: &'static str = "strokes";
}

impl FromUrl for StrokeScriptInput {
  type Error = StrokeScriptInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(StrokeScriptInputError::SchemeMismatch);
    }

    let path = url_path(url);
    let script = StrokeScript::from_json(&std::fs::read_to_string(&path)?)?;
    info!("读取笔画脚本: {} ({} 个事件)", path, script.events.len());

    Self::try_from(script)
  }
}

impl TryFrom<StrokeScript> for StrokeScriptInput {
  type Error = StrokeScriptInputError;

  fn try_from(script: StrokeScript) -> Result<Self, Self::Error> {
    let image = script.render()?;
    Ok(Self {
      script,
      image: Some(image),
    })
  }
}

impl StrokeScriptInput {
  pub fn script(&self) -> &StrokeScript {
    &self.script
  }

  pub fn into_script(self) -> StrokeScript {
    self.script
  }
}

impl Iterator for StrokeScriptInput {
  type Item = RgbaImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}
