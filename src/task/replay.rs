// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/task/replay.rs - 笔画回放任务
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
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::{
  frame::ModelInput,
  input::{PointerEvent, StrokeScript},
  model::{Model, PredictionVector},
  output::Render,
  preprocess::Preprocessor,
  session::{ModelStatus, PredictionUpdate, Session, StrokeOutcome},
  task::Task,
  worker::{InferenceWorker, WorkerEvent},
};

/// 逐个回放笔画脚本中的事件，模拟交互式画板：
/// 抬笔时在后台线程推理，每次结果更新都交给输出渲染。
#[derive(Default, Debug)]
pub struct ReplayTask {
  preprocessor: Preprocessor,
  step_delay: Option<Duration>,
  handle_interrupt: bool,
  reply_timeout: Option<Duration>,
}

const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl ReplayTask {
  pub fn new(preprocessor: Preprocessor) -> Self {
    Self {
      preprocessor,
      ..Default::default()
    }
  }

  /// 每个事件之后停顿一段时间，让推理与后续笔画交错
  pub fn with_step_delay(mut self, step_delay: Option<Duration>) -> Self {
    self.step_delay = step_delay;
    self
  }

  /// 安装 Ctrl-C 处理器；一个进程只能安装一次
  pub fn with_interrupt(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }

  pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
    self.reply_timeout = Some(reply_timeout);
    self
  }

  fn interrupt_channel(&self) -> anyhow::Result<Receiver<()>> {
    let (tx, rx) = mpsc::channel();
    if self.handle_interrupt {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    } else {
      // 发送端随即释放，接收端只会返回 Disconnected
      drop(tx);
    }
    Ok(rx)
  }
}

/// 把事件应用到会话上，返回是否是一条推理结果
fn apply_event(event: WorkerEvent, session: &mut Session) -> bool {
  let is_reply = matches!(event, WorkerEvent::Reply(_));
  event.apply(session);
  is_reply
}

/// 用结果对应的快照渲染，而不是此刻的画布
fn render_updates<O, RE>(updates: &Receiver<PredictionUpdate>, output: &O) -> Result<(), RE>
where
  O: Render<RgbaImage, PredictionVector, Error = RE>,
{
  for update in updates.try_iter() {
    output.render_result(&update.frame, &update.prediction)?;
  }
  Ok(())
}

impl<L, M, O, RE> Task<StrokeScript, L, O> for ReplayTask
where
  L: FnOnce() -> Result<M, M::Error> + Send + 'static,
  M: Model<Input = ModelInput, Output = PredictionVector> + 'static,
  M::Error: Display,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<RgbaImage, PredictionVector, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, script: StrokeScript, load: L, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupted = self.interrupt_channel()?;
    let is_interrupted = || interrupted.try_recv().is_ok();

    let events = script.pointer_events()?;
    let mut session = Session::new(script.new_canvas()?, self.preprocessor);
    let updates = session.subscribe();
    // 订阅时会先收到当前的全零结果
    let _ = updates.try_recv();

    let worker = InferenceWorker::spawn(load)?;
    let reply_timeout = self.reply_timeout.unwrap_or(DEFAULT_REPLY_TIMEOUT);

    info!("等待模型加载...");
    while *session.model_status() == ModelStatus::Loading {
      if is_interrupted() {
        warn!("中断信号接收，退出任务");
        return Ok(());
      }
      if let Some(event) = worker.wait_event(POLL_INTERVAL)? {
        apply_event(event, &mut session);
      }
    }

    let mut pending = 0usize;
    for (index, event) in events.into_iter().enumerate() {
      debug!("回放第 {} 个事件: {:?}", index + 1, event);
      match event {
        PointerEvent::Down(at) => session.pointer_down(at),
        PointerEvent::Move(to) => session.pointer_move(to),
        PointerEvent::Up => match session.pointer_up()? {
          StrokeOutcome::Request(request) => {
            worker.submit(request)?;
            pending += 1;
          }
          StrokeOutcome::Blank => info!("画布为空白，结果清零"),
          StrokeOutcome::ModelNotReady => warn!("模型不可用，本笔画不推理"),
          StrokeOutcome::Ignored => {}
        },
        PointerEvent::Clear => session.clear(),
      }

      while let Some(event) = worker.try_event() {
        if apply_event(event, &mut session) {
          pending -= 1;
        }
      }
      render_updates(&updates, &output)?;

      if is_interrupted() {
        warn!("中断信号接收，退出任务循环");
        return Ok(());
      }
      if let Some(delay) = self.step_delay {
        thread::sleep(delay);
      }
    }

    // 等待仍在进行的推理
    let deadline = Instant::now() + reply_timeout;
    while pending > 0 {
      if is_interrupted() {
        warn!("中断信号接收，退出任务循环");
        return Ok(());
      }
      if Instant::now() >= deadline {
        warn!("等待推理结果超时，仍有 {} 个请求未完成", pending);
        break;
      }
      if let Some(event) = worker.wait_event(POLL_INTERVAL)?
        && apply_event(event, &mut session)
      {
        pending -= 1;
      }
    }
    render_updates(&updates, &output)?;

    for event in worker.shutdown() {
      apply_event(event, &mut session);
    }
    render_updates(&updates, &output)?;

    info!("任务完成，最终结果: {:?}", session.current().scores());
    Ok(())
  }
}
