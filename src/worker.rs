// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/worker.rs - 后台推理线程
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

use std::fmt::Display;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  frame::ModelInput,
  model::{Model, PredictionVector},
  session::{InferenceReply, InferenceRequest, ModelStatus, Session},
};

#[derive(Error, Debug)]
pub enum WorkerError {
  #[error("无法启动推理线程: {0}")]
  SpawnError(#[from] std::io::Error),
  #[error("推理线程已退出")]
  Disconnected,
}

/// 推理线程发回的事件
#[derive(Debug)]
pub enum WorkerEvent {
  ModelReady,
  ModelFailed(String),
  Reply(InferenceReply),
}

impl WorkerEvent {
  /// 把事件交给会话处理
  pub fn apply(self, session: &mut Session) {
    match self {
      WorkerEvent::ModelReady => session.set_model_status(ModelStatus::Ready),
      WorkerEvent::ModelFailed(e) => session.set_model_status(ModelStatus::Failed(e)),
      WorkerEvent::Reply(reply) => {
        session.complete(reply);
      }
    }
  }
}

/// 在独立线程中加载模型并逐个处理推理请求。
///
/// 模型只在该线程中存在，加载本身也在该线程中完成，
/// 因此模型类型不需要 `Send`。
pub struct InferenceWorker {
  requests: Option<Sender<InferenceRequest>>,
  events: Receiver<WorkerEvent>,
  handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
  pub fn spawn<M, F>(load: F) -> Result<Self, WorkerError>
  where
    F: FnOnce() -> Result<M, M::Error> + Send + 'static,
    M: Model<Input = ModelInput, Output = PredictionVector> + 'static,
    M::Error: Display,
  {
    let (req_tx, req_rx) = mpsc::channel::<InferenceRequest>();
    let (ev_tx, ev_rx) = mpsc::channel();

    let handle = thread::Builder::new()
      .name("tuya-inference".to_string())
      .spawn(move || {
        info!("推理线程启动，开始加载模型...");
        let model = match load() {
          Ok(model) => {
            let _ = ev_tx.send(WorkerEvent::ModelReady);
            model
          }
          Err(e) => {
            error!("模型加载失败: {}", e);
            let _ = ev_tx.send(WorkerEvent::ModelFailed(e.to_string()));
            return;
          }
        };

        for request in req_rx {
          let reply = request.run(&model);
          if ev_tx.send(WorkerEvent::Reply(reply)).is_err() {
            warn!("事件接收端已关闭，推理线程退出");
            break;
          }
        }
        info!("推理线程退出");
      })?;

    Ok(Self {
      requests: Some(req_tx),
      events: ev_rx,
      handle: Some(handle),
    })
  }

  pub fn submit(&self, request: InferenceRequest) -> Result<(), WorkerError> {
    self
      .requests
      .as_ref()
      .ok_or(WorkerError::Disconnected)?
      .send(request)
      .map_err(|_| WorkerError::Disconnected)
  }

  pub fn try_event(&self) -> Option<WorkerEvent> {
    self.events.try_recv().ok()
  }

  /// 等待下一个事件；超时返回 `Ok(None)`，线程已退出返回错误
  pub fn wait_event(&self, timeout: Duration) -> Result<Option<WorkerEvent>, WorkerError> {
    match self.events.recv_timeout(timeout) {
      Ok(event) => Ok(Some(event)),
      Err(RecvTimeoutError::Timeout) => Ok(None),
      Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
    }
  }

  /// 关闭请求通道并等待线程结束，返回尚未取走的事件
  pub fn shutdown(mut self) -> Vec<WorkerEvent> {
    self.requests.take();
    if let Some(handle) = self.handle.take()
      && handle.join().is_err()
    {
      error!("推理线程异常退出");
    }
    self.events.try_iter().collect()
  }
}

impl Drop for InferenceWorker {
  fn drop(&mut self) {
    self.requests.take();
    if let Some(handle) = self.handle.take() {
      let _ = handle.join();
    }
  }
}
