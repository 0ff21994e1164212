// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/output/draw.rs - 预测结果可视化
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

use image::{Rgba, RgbaImage, imageops};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};

use crate::{
  canvas::BACKGROUND,
  model::{CATEGORY_NUM, PredictionVector},
};

// 图表布局常量
const CHART_PADDING: u32 = 12;
const BAR_HEIGHT: u32 = 16;
const BAR_GAP: u32 = 6;
const BAR_LENGTH: u32 = 200; // 100 分对应的长度
const TRACK_COLOR: [u8; 4] = [236, 236, 236, 255];
const HIGHLIGHT_COLOR: [u8; 4] = [0, 0, 0, 255];

/// 横向柱状图，每个类别一行，顺序同 [`crate::model::DoodleLabel::ALL`]
pub struct Chart {
  padding: u32,
  bar_height: u32,
  bar_gap: u32,
  bar_length: u32,
  track_color: [u8; 4],
  highlight_color: [u8; 4],
}

impl Default for Chart {
  fn default() -> Self {
    Self {
      padding: CHART_PADDING,
      bar_height: BAR_HEIGHT,
      bar_gap: BAR_GAP,
      bar_length: BAR_LENGTH,
      track_color: TRACK_COLOR,
      highlight_color: HIGHLIGHT_COLOR,
    }
  }
}

/// 把半透明颜色叠到白底上，得到不透明颜色
pub fn opaque_on_white(color: [u8; 4]) -> Rgba<u8> {
  let alpha = color[3] as u32;
  let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
  Rgba([blend(color[0]), blend(color[1]), blend(color[2]), 255])
}

impl Chart {
  /// 图表面板的宽和高
  pub fn panel_size(&self) -> (u32, u32) {
    let rows = CATEGORY_NUM as u32;
    let width = self.padding * 2 + self.bar_length;
    let height = self.padding * 2 + rows * self.bar_height + (rows - 1) * self.bar_gap;
    (width, height)
  }

  fn row_top(&self, index: usize) -> u32 {
    self.padding + index as u32 * (self.bar_height + self.bar_gap)
  }

  /// 第 `index` 行柱子的区域；得分为 0 时没有柱子
  pub fn bar_rect(&self, index: usize, score: u8) -> Option<Rect> {
    let length = self.bar_length * score.min(100) as u32 / 100;
    if length == 0 {
      return None;
    }
    Some(Rect::at(self.padding as i32, self.row_top(index) as i32).of_size(length, self.bar_height))
  }

  pub fn draw_chart(&self, result: &PredictionVector) -> RgbaImage {
    let (width, height) = self.panel_size();
    let mut panel = RgbaImage::from_pixel(width, height, BACKGROUND);

    for (index, (label, score)) in result.labelled().enumerate() {
      let track = Rect::at(self.padding as i32, self.row_top(index) as i32)
        .of_size(self.bar_length, self.bar_height);
      draw_filled_rect_mut(&mut panel, track, Rgba(self.track_color));

      if let Some(bar) = self.bar_rect(index, score) {
        draw_filled_rect_mut(&mut panel, bar, opaque_on_white(label.color()));
      }
    }

    // 最高分的类别加边框
    if let Some((label, score)) = result.top()
      && let Some(bar) = self.bar_rect(label as usize, score)
    {
      draw_hollow_rect_mut(&mut panel, bar, Rgba(self.highlight_color));
    }

    panel
  }

  /// 左侧为草图，右侧为图表
  pub fn compose(&self, sketch: &RgbaImage, result: &PredictionVector) -> RgbaImage {
    let panel = self.draw_chart(result);
    let width = sketch.width() + panel.width();
    let height = sketch.height().max(panel.height());

    let mut image = RgbaImage::from_pixel(width, height, BACKGROUND);
    imageops::replace(&mut image, sketch, 0, 0);
    imageops::replace(&mut image, &panel, sketch.width() as i64, 0);
    image
  }
}
