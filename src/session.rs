// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/session.rs - 交互式绘图会话
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

//! 绘图会话状态机：
//!
//! - `Idle` --按下--> `Drawing`
//! - `Drawing` --抬起--> `Idle`，对画布快照做预处理并发出推理请求
//! - 任意状态 --清空--> `Idle`，发布全零结果，之前发出的请求全部作废
//!
//! 每个推理请求带有递增的代号，迟到的旧结果按代号丢弃。

use std::fmt::Display;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::{
  canvas::{Canvas, Point},
  frame::ModelInput,
  model::{Model, PredictionVector},
  preprocess::{BoundingBox, PreprocessError, Preprocessed, Preprocessor},
  store::PredictionStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
  Idle,
  Drawing,
}

/// 模型加载状态；未加载完成不是错误，只是跳过推理
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
  Loading,
  Ready,
  Failed(String),
}

/// 发布给订阅者的结果，附带产生它的画布画面
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionUpdate {
  pub prediction: PredictionVector,
  pub frame: Arc<RgbaImage>,
}

/// 抬笔时交给推理端的请求，持有画布快照而不是画布本身
#[derive(Debug, Clone)]
pub struct InferenceRequest {
  pub generation: u64,
  pub snapshot: Arc<RgbaImage>,
  pub region: BoundingBox,
  pub tensor: ModelInput,
}

impl InferenceRequest {
  pub fn run<M>(&self, model: &M) -> InferenceReply
  where
    M: Model<Input = ModelInput, Output = PredictionVector>,
    M::Error: Display,
  {
    let now = std::time::Instant::now();
    let result = model.infer(&self.tensor).map_err(|e| e.to_string());
    debug!("第 {} 代推理完成，耗时: {:.2?}", self.generation, now.elapsed());
    InferenceReply {
      generation: self.generation,
      snapshot: self.snapshot.clone(),
      result,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReply {
  pub generation: u64,
  /// 请求时的画布快照，与结果一起发布
  pub snapshot: Arc<RgbaImage>,
  pub result: Result<PredictionVector, String>,
}

/// 抬笔的处理结果
#[derive(Debug)]
pub enum StrokeOutcome {
  /// 需要推理
  Request(InferenceRequest),
  /// 画布为空白，已发布全零结果
  Blank,
  /// 模型尚不可用，未做推理
  ModelNotReady,
  /// 当前没有正在进行的笔画
  Ignored,
}

/// 推理结果的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
  Applied(PredictionVector),
  Stale,
  Failed(String),
}

pub struct Session {
  canvas: Canvas,
  preprocessor: Preprocessor,
  store: PredictionStore<PredictionUpdate>,
  state: DrawState,
  model_status: ModelStatus,
  issued: u64,
  applied: u64,
  cleared: u64,
}

impl Session {
  pub fn new(canvas: Canvas, preprocessor: Preprocessor) -> Self {
    let store = PredictionStore::with_initial(PredictionUpdate {
      prediction: PredictionVector::ZERO,
      frame: Arc::new(canvas.snapshot()),
    });
    Self {
      canvas,
      preprocessor,
      store,
      state: DrawState::Idle,
      model_status: ModelStatus::Loading,
      issued: 0,
      applied: 0,
      cleared: 0,
    }
  }

  pub fn state(&self) -> DrawState {
    self.state
  }

  pub fn canvas(&self) -> &Canvas {
    &self.canvas
  }

  pub fn model_status(&self) -> &ModelStatus {
    &self.model_status
  }

  pub fn set_model_status(&mut self, status: ModelStatus) {
    match &status {
      ModelStatus::Ready => info!("模型已就绪"),
      ModelStatus::Failed(e) => warn!("模型加载失败，之后的笔画不会触发推理: {}", e),
      ModelStatus::Loading => debug!("模型加载中"),
    }
    self.model_status = status;
  }

  pub fn current(&self) -> PredictionVector {
    self.store.current().prediction
  }

  /// 每次发布都带上得到该结果时的画布快照
  pub fn subscribe(&mut self) -> Receiver<PredictionUpdate> {
    self.store.subscribe()
  }

  pub fn pointer_down(&mut self, at: Point) {
    self.canvas.begin_stroke(at);
    self.state = DrawState::Drawing;
  }

  pub fn pointer_move(&mut self, to: Point) {
    if self.state == DrawState::Drawing {
      self.canvas.line_to(to);
    }
  }

  pub fn pointer_up(&mut self) -> Result<StrokeOutcome, PreprocessError> {
    if self.state != DrawState::Drawing {
      return Ok(StrokeOutcome::Ignored);
    }
    self.state = DrawState::Idle;
    self.canvas.end_stroke();

    let snapshot = Arc::new(self.canvas.snapshot());
    let (region, tensor) = match self.preprocessor.run(&snapshot)? {
      Preprocessed::Blank => {
        self.store.publish(PredictionUpdate {
          prediction: PredictionVector::ZERO,
          frame: snapshot,
        });
        return Ok(StrokeOutcome::Blank);
      }
      Preprocessed::Ready { region, tensor } => (region, tensor),
    };

    if self.model_status != ModelStatus::Ready {
      debug!("模型不可用 ({:?})，跳过推理", self.model_status);
      return Ok(StrokeOutcome::ModelNotReady);
    }

    self.issued += 1;
    debug!("发出第 {} 代推理请求，区域 {:?}", self.issued, region);
    Ok(StrokeOutcome::Request(InferenceRequest {
      generation: self.issued,
      snapshot,
      region,
      tensor,
    }))
  }

  /// 清空画布；不经过预处理，直接发布全零结果
  pub fn clear(&mut self) {
    self.canvas.clear();
    self.state = DrawState::Idle;
    self.cleared = self.issued;
    self.store.publish(PredictionUpdate {
      prediction: PredictionVector::ZERO,
      frame: Arc::new(self.canvas.snapshot()),
    });
    debug!("画布已清空，第 {} 代及之前的请求作废", self.cleared);
  }

  pub fn complete(&mut self, reply: InferenceReply) -> ReplyOutcome {
    if reply.generation <= self.applied || reply.generation <= self.cleared {
      debug!(
        "丢弃过期的第 {} 代结果（已应用 {}, 已清空 {}）",
        reply.generation, self.applied, self.cleared
      );
      return ReplyOutcome::Stale;
    }
    self.applied = reply.generation;

    match reply.result {
      Ok(prediction) => {
        self.store.publish(PredictionUpdate {
          prediction,
          frame: reply.snapshot,
        });
        ReplyOutcome::Applied(prediction)
      }
      Err(e) => {
        warn!("第 {} 代推理失败: {}", reply.generation, e);
        ReplyOutcome::Failed(e)
      }
    }
  }
}
