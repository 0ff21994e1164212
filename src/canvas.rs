// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/canvas.rs - 绘图画布
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

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CANVAS_WIDTH: u32 = 400;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 400;

/// 画布背景色（白色）
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// 默认笔画颜色（黑色）
pub const DEFAULT_INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Error, Debug, PartialEq)]
pub enum CanvasError {
  #[error("画布尺寸无效: {0}x{1}")]
  InvalidSize(u32, u32),
  #[error("视口尺寸无效: {0}x{1}")]
  InvalidViewport(f32, f32),
}

/// 画布坐标系下的一个点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

/// 画布元素在页面上的显示区域，用于把客户端坐标换算成画布像素坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
  left: f32,
  top: f32,
  width: f32,
  height: f32,
  canvas_width: u32,
  canvas_height: u32,
}

impl Viewport {
  pub fn new(
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    canvas_width: u32,
    canvas_height: u32,
  ) -> Result<Self, CanvasError> {
    if !(width > 0.0 && height > 0.0) {
      return Err(CanvasError::InvalidViewport(width, height));
    }
    if canvas_width == 0 || canvas_height == 0 {
      return Err(CanvasError::InvalidSize(canvas_width, canvas_height));
    }

    Ok(Self {
      left,
      top,
      width,
      height,
      canvas_width,
      canvas_height,
    })
  }

  /// (x 缩放比例, y 缩放比例)
  pub fn scale(&self) -> (f32, f32) {
    (
      self.canvas_width as f32 / self.width,
      self.canvas_height as f32 / self.height,
    )
  }

  pub fn to_canvas(&self, client_x: f32, client_y: f32) -> Point {
    let (x_scale, y_scale) = self.scale();
    Point::new(
      (client_x - self.left) * x_scale,
      (client_y - self.top) * y_scale,
    )
  }

  /// 触摸事件只取第一个触点
  pub fn touch_to_canvas(&self, touches: &[Point]) -> Option<Point> {
    touches.first().map(|t| self.to_canvas(t.x, t.y))
  }
}

/// 笔画样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
  pub color: Rgba<u8>,
  pub line_width: f32,
}

impl Default for StrokeStyle {
  fn default() -> Self {
    Self {
      color: DEFAULT_INK,
      line_width: 1.0,
    }
  }
}

/// 白底 RGBA 画布，记录当前笔画的落点
#[derive(Debug, Clone)]
pub struct Canvas {
  image: RgbaImage,
  style: StrokeStyle,
  cursor: Option<Point>,
}

impl Canvas {
  pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
    if width == 0 || height == 0 {
      return Err(CanvasError::InvalidSize(width, height));
    }

    Ok(Self {
      image: RgbaImage::from_pixel(width, height, BACKGROUND),
      style: StrokeStyle::default(),
      cursor: None,
    })
  }

  pub fn with_style(mut self, style: StrokeStyle) -> Self {
    self.style = style;
    self
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn image(&self) -> &RgbaImage {
    &self.image
  }

  pub fn is_stroking(&self) -> bool {
    self.cursor.is_some()
  }

  /// 用背景色重新填充整张画布
  pub fn clear(&mut self) {
    for pixel in self.image.pixels_mut() {
      *pixel = BACKGROUND;
    }
    self.cursor = None;
  }

  pub fn begin_stroke(&mut self, at: Point) {
    self.cursor = Some(at);
  }

  /// 从上一个落点画线到 `to`；不在笔画中时忽略
  pub fn line_to(&mut self, to: Point) {
    let Some(from) = self.cursor else {
      return;
    };
    self.draw_segment(from, to);
    self.cursor = Some(to);
  }

  pub fn end_stroke(&mut self) {
    self.cursor = None;
  }

  /// 拷贝一份当前像素，之后的笔画不会影响这份快照
  pub fn snapshot(&self) -> RgbaImage {
    self.image.clone()
  }

  fn draw_segment(&mut self, from: Point, to: Point) {
    let color = self.style.color;
    // 按笔画半径外扩画布边界，只画与之相交的部分
    let radius = (self.style.line_width / 2.0).round().max(0.0);
    let bounds = (
      -radius - 1.0,
      -radius - 1.0,
      self.width() as f32 + radius,
      self.height() as f32 + radius,
    );
    let Some((from, to)) = clip_segment(from, to, bounds) else {
      return;
    };

    if self.style.line_width <= 1.0 {
      draw_line_segment_mut(&mut self.image, (from.x, from.y), (to.x, to.y), color);
      return;
    }

    // 粗笔画：沿线段每隔一个像素盖一个实心圆
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
      let t = i as f32 / steps as f32;
      let center = (
        (from.x + dx * t).round() as i32,
        (from.y + dy * t).round() as i32,
      );
      draw_filled_circle_mut(&mut self.image, center, radius as i32, color);
    }
    debug!("绘制笔画段 {:?} -> {:?}, {} 步", from, to, steps);
  }
}

/// Liang-Barsky 裁剪：把线段截到 `(min_x, min_y, max_x, max_y)` 内；
/// 完全在外或含非有限坐标时返回 `None`
pub fn clip_segment(from: Point, to: Point, bounds: (f32, f32, f32, f32)) -> Option<(Point, Point)> {
  if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
    return None;
  }
  let (min_x, min_y, max_x, max_y) = bounds;
  let (dx, dy) = (to.x - from.x, to.y - from.y);
  let (mut t0, mut t1) = (0.0f32, 1.0f32);

  for (p, q) in [
    (-dx, from.x - min_x),
    (dx, max_x - from.x),
    (-dy, from.y - min_y),
    (dy, max_y - from.y),
  ] {
    if p == 0.0 {
      if q < 0.0 {
        return None;
      }
      continue;
    }
    let r = q / p;
    if p < 0.0 {
      if r > t1 {
        return None;
      }
      t0 = t0.max(r);
    } else {
      if r < t0 {
        return None;
      }
      t1 = t1.min(r);
    }
  }

  Some((
    Point::new(from.x + dx * t0, from.y + dy * t0),
    Point::new(from.x + dx * t1, from.y + dy * t1),
  ))
}
