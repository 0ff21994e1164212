// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/task.rs - 任务运行器
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

use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::{
  frame::ModelInput,
  model::{Model, PredictionVector},
  output::Render,
  preprocess::{Preprocessed, Preprocessor},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 预处理一帧并推理；空白画布直接得到全零结果，不调用模型
pub fn classify<M, ME>(
  preprocessor: &Preprocessor,
  model: &M,
  frame: &RgbaImage,
) -> anyhow::Result<PredictionVector>
where
  ME: std::error::Error + Sync + Send + 'static,
  M: Model<Input = ModelInput, Output = PredictionVector, Error = ME>,
{
  match preprocessor.run(frame)? {
    Preprocessed::Blank => {
      info!("画布为空白，跳过推理");
      Ok(PredictionVector::ZERO)
    }
    Preprocessed::Ready { region, tensor } => {
      debug!("墨迹区域: {:?}", region);
      Ok(model.infer(&tensor)?)
    }
  }
}

#[derive(Default, Debug)]
pub struct OneShotTask {
  preprocessor: Preprocessor,
}

impl OneShotTask {
  pub fn new(preprocessor: Preprocessor) -> Self {
    Self { preprocessor }
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbaImage>,
  M: Model<Input = ModelInput, Output = PredictionVector, Error = ME>,
  O: Render<RgbaImage, PredictionVector, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = classify(&self.preprocessor, &model, &frame)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复推理，统计平均耗时（不计前两次预热）
#[derive(Debug)]
pub struct RepeatShotTask {
  preprocessor: Preprocessor,
  repeat_times: usize,
}

const REPEAT_TIMES: usize = 1000;
const WARMUP_TIMES: usize = 2;

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      preprocessor: Preprocessor::default(),
      repeat_times: REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn new(preprocessor: Preprocessor) -> Self {
    Self {
      preprocessor,
      ..Default::default()
    }
  }

  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(1);
    self
  }
}

/// 去掉预热后的平均耗时；次数不够时取全部
pub fn average_elapsed(times: &[Duration]) -> Duration {
  let skip = if times.len() > WARMUP_TIMES {
    WARMUP_TIMES
  } else {
    0
  };
  let counted = &times[skip..];
  if counted.is_empty() {
    return Duration::ZERO;
  }
  counted.iter().sum::<Duration>() / counted.len() as u32
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbaImage>,
  M: Model<Input = ModelInput, Output = PredictionVector, Error = ME>,
  O: Render<RgbaImage, PredictionVector, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let result = classify(&self.preprocessor, &model, &frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      info!("({})渲染完成，耗时: {:.2?}", i, now.elapsed());
      times.push(elapsed);
    }

    warn!("平均推理时间: {:.2?}", average_elapsed(&times));

    Ok(())
  }
}

#[cfg(feature = "stroke_script")]
mod replay;
#[cfg(feature = "stroke_script")]
pub use self::replay::ReplayTask;
