use crate::core::{
    AudioBuffer, LateFramePolicy, PlaybackClock, PlaybackState, Result, SharedStatus, StreamKind,
    TimeBase, TransportCommand, VideoFrame,
};
use crate::player::stages::{FrameConverter, PacketSource, PresentationSink, StreamDecoder};
use crossbeam_channel::{select, Receiver, RecvTimeoutError, TryRecvError};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// 文件结束后等待音频尾部播放的额外上限
const AUDIO_TAIL_GRACE: Duration = Duration::from_millis(500);
const AUDIO_TAIL_POLL: Duration = Duration::from_millis(20);

/// 同步器状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// 还没有解出第一帧视频，时钟未启动
    Uninitialized,
    Running,
    Paused,
    /// 已到文件末尾，正在排空解码器
    Draining,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    #[default]
    EndOfStream,
    Quit,
}

/// 一次播放的统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaybackReport {
    pub packets_read: u64,
    pub video_packets: u64,
    pub audio_packets: u64,
    pub video_frames_presented: u64,
    pub late_frames_dropped: u64,
    /// 每声道采样数
    pub audio_frames_queued: u64,
    pub audio_bytes_queued: u64,
    pub decode_errors: u64,
    pub end: EndReason,
}

/// 解封装 → 解码 → 转换 的各个环节
pub struct Pipeline<S, VD, VC, AD, AC> {
    pub source: S,
    pub video_decoder: VD,
    pub pixel_converter: VC,
    pub audio_decoder: AD,
    pub resampler: AC,
}

/// 同步调度器 - 单线程协作式控制循环
///
/// 每轮最多拉一个包，送给对应解码器，取尽解出的帧并转换。
/// 视频帧按 PTS 截止时间阻塞等待后再呈现；音频转换后立即入队，
/// 由输出设备自己的消费速度充当音频时钟。
///
/// 唯一的挂起点是节拍等待，它通过命令通道的 `recv_timeout` 实现，
/// 所以 Pause/Quit 能在等待中途被及时处理。
pub struct Synchronizer<S, VD, VC, AD, AC, K> {
    pipeline: Pipeline<S, VD, VC, AD, AC>,
    sink: K,
    clock: PlaybackClock,
    commands: Receiver<TransportCommand>,
    status: SharedStatus,
    late_policy: LateFramePolicy,
    state: SyncState,
    resume_to: SyncState,
    report: PlaybackReport,
}

impl<S, VD, VC, AD, AC, K> Synchronizer<S, VD, VC, AD, AC, K>
where
    S: PacketSource,
    VD: StreamDecoder<Packet = S::Packet>,
    VC: FrameConverter<Input = VD::Frame, Output = VideoFrame>,
    AD: StreamDecoder<Packet = S::Packet>,
    AC: FrameConverter<Input = AD::Frame, Output = AudioBuffer>,
    K: PresentationSink,
{
    pub fn new(
        pipeline: Pipeline<S, VD, VC, AD, AC>,
        sink: K,
        video_time_base: TimeBase,
        commands: Receiver<TransportCommand>,
        status: SharedStatus,
    ) -> Self {
        status.set_state(PlaybackState::Playing);
        Self {
            pipeline,
            sink,
            clock: PlaybackClock::new(video_time_base),
            commands,
            status,
            late_policy: LateFramePolicy::default(),
            state: SyncState::Uninitialized,
            resume_to: SyncState::Uninitialized,
            report: PlaybackReport::default(),
        }
    }

    pub fn with_late_policy(mut self, policy: LateFramePolicy) -> Self {
        self.late_policy = policy;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> SyncState {
        self.state
    }

    #[cfg(test)]
    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    #[cfg(test)]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    #[cfg(test)]
    pub fn pipeline(&self) -> &Pipeline<S, VD, VC, AD, AC> {
        &self.pipeline
    }

    /// 收到开始信号（窗口已就绪）后再运行
    ///
    /// 等待期间照常处理传输命令；Quit 或开始信号通道关闭时直接结束，
    /// 不读取任何数据包。
    pub fn run_when_started(&mut self, start: &Receiver<()>) -> Result<PlaybackReport> {
        if self.wait_for_start(start) {
            self.run()
        } else {
            info!("🛑 未开始播放即退出");
            Ok(self.report.clone())
        }
    }

    fn wait_for_start(&mut self, start: &Receiver<()>) -> bool {
        debug!("等待开始信号");
        let commands = self.commands.clone();
        while self.state != SyncState::Terminated {
            select! {
                recv(start) -> signal => {
                    if signal.is_ok() {
                        return true;
                    }
                    self.apply(TransportCommand::Quit);
                }
                recv(commands) -> command => match command {
                    Ok(command) => self.apply(command),
                    Err(_) => self.apply(TransportCommand::Quit),
                },
            }
        }
        false
    }

    /// 运行直到文件结束、收到退出命令或遇到致命错误
    pub fn run(&mut self) -> Result<PlaybackReport> {
        info!("🎬 同步器启动");
        let result = self.run_loop();
        self.terminate();

        match result {
            Ok(()) => {
                info!("🛑 同步器退出: {:?}", self.report);
                Ok(self.report.clone())
            }
            Err(e) => {
                error!("❌ 播放中止: {}", e);
                Err(e)
            }
        }
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            self.poll_commands();

            match self.state {
                SyncState::Terminated => return Ok(()),
                SyncState::Paused => {
                    self.wait_while_paused();
                    continue;
                }
                _ => {}
            }

            match self.pipeline.source.next_packet()? {
                Some((kind, packet)) => {
                    self.report.packets_read += 1;
                    self.route(kind, &packet)?;
                    // packet 在这里释放，不跨轮保留
                }
                None => {
                    self.drain()?;
                    return Ok(());
                }
            }
        }
    }

    fn route(&mut self, kind: StreamKind, packet: &S::Packet) -> Result<()> {
        match kind {
            StreamKind::Video => {
                self.report.video_packets += 1;
                submit_packet(&mut self.pipeline.video_decoder, packet, kind, &mut self.report)?;
                self.pump_video()
            }
            StreamKind::Audio => {
                self.report.audio_packets += 1;
                submit_packet(&mut self.pipeline.audio_decoder, packet, kind, &mut self.report)?;
                self.pump_audio()
            }
        }
    }

    /// 取尽视频解码器当前能给出的帧
    fn pump_video(&mut self) -> Result<()> {
        while self.state != SyncState::Terminated {
            let frame = match self.pipeline.video_decoder.receive() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    warn!("⚠️  视频解码错误（已跳过）: {}", e);
                    self.report.decode_errors += 1;
                    break;
                }
                Err(e) => return Err(e),
            };
            let converted = self.pipeline.pixel_converter.convert(&frame)?;
            drop(frame);
            self.present(converted)?;
        }
        Ok(())
    }

    /// 取尽音频解码器当前能给出的帧，转换后立即入队
    fn pump_audio(&mut self) -> Result<()> {
        while self.state != SyncState::Terminated {
            let frame = match self.pipeline.audio_decoder.receive() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    warn!("⚠️  音频解码错误（已跳过）: {}", e);
                    self.report.decode_errors += 1;
                    break;
                }
                Err(e) => return Err(e),
            };
            let buffer = self.pipeline.resampler.convert(&frame)?;
            self.queue_audio(&buffer)?;
        }
        Ok(())
    }

    fn queue_audio(&mut self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.sink.queue_audio(buffer)?;
        self.report.audio_frames_queued += buffer.frames() as u64;
        self.report.audio_bytes_queued += buffer.byte_len() as u64;
        Ok(())
    }

    fn present(&mut self, frame: VideoFrame) -> Result<()> {
        if self.state == SyncState::Uninitialized {
            self.state = SyncState::Running;
        }

        if let Some(pts) = frame.pts {
            if self.clock.start_at(Instant::now()) {
                info!("⏱️  播放时钟原点已记录（首帧 PTS {}）", pts);
            }

            if !self.wait_until_due(pts) {
                return Ok(());
            }

            if let LateFramePolicy::DropLaterThan(threshold) = self.late_policy {
                if let Some(late) = self.clock.lateness_at(pts, Instant::now()) {
                    if late > threshold {
                        debug!("丢弃迟到帧 PTS {}（迟到 {:?}）", pts, late);
                        self.report.late_frames_dropped += 1;
                        return Ok(());
                    }
                }
            }
        }

        self.sink.present_video(&frame)?;
        self.report.video_frames_presented += 1;
        self.status.record_frame(self.clock.position_ms(Instant::now()));
        Ok(())
    }

    /// 阻塞到截止时间；期间处理命令。返回 false 表示已退出
    fn wait_until_due(&mut self, pts: i64) -> bool {
        loop {
            match self.state {
                SyncState::Terminated => return false,
                SyncState::Paused => {
                    self.wait_while_paused();
                    continue;
                }
                _ => {}
            }

            let Some(delay) = self.clock.delay_at(pts, Instant::now()) else {
                return true;
            };

            match self.commands.recv_timeout(delay) {
                Ok(command) => self.apply(command),
                // 超时后回到循环顶部重新核对，保证绝不早于截止时间呈现
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.apply(TransportCommand::Quit),
            }
        }
    }

    fn wait_while_paused(&mut self) {
        while self.state == SyncState::Paused {
            match self.commands.recv() {
                Ok(command) => self.apply(command),
                Err(_) => self.apply(TransportCommand::Quit),
            }
        }
    }

    fn poll_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.apply(TransportCommand::Quit);
                    break;
                }
            }
        }
    }

    /// 处理一条传输命令；重复的 Play/Pause 不改变任何状态
    fn apply(&mut self, command: TransportCommand) {
        let now = Instant::now();
        match command {
            TransportCommand::Pause => match self.state {
                SyncState::Paused | SyncState::Terminated => {}
                current => {
                    self.resume_to = current;
                    self.state = SyncState::Paused;
                    self.clock.pause_at(now);
                    self.status.set_state(PlaybackState::Paused);
                    info!("⏸️  暂停");
                }
            },
            TransportCommand::Play => {
                if self.state == SyncState::Paused {
                    self.state = self.resume_to;
                    self.clock.resume_at(now);
                    self.status.set_state(PlaybackState::Playing);
                    info!("▶️  继续播放");
                }
            }
            TransportCommand::Quit => {
                if self.state != SyncState::Terminated {
                    info!("⏹  收到退出命令");
                    self.report.end = EndReason::Quit;
                    self.terminate();
                }
            }
        }
    }

    /// 文件结束：冲刷两个解码器，剩余帧照常转换、（视频）按节拍呈现
    fn drain(&mut self) -> Result<()> {
        info!("📄 到达文件末尾，排空解码器");
        self.state = SyncState::Draining;

        // 音频不受节拍约束，先排空
        flush_decoder(&mut self.pipeline.audio_decoder, StreamKind::Audio, &mut self.report)?;
        self.pump_audio()?;
        if let Some(rest) = self.pipeline.resampler.drain()? {
            self.queue_audio(&rest)?;
        }

        flush_decoder(&mut self.pipeline.video_decoder, StreamKind::Video, &mut self.report)?;
        self.pump_video()?;
        self.wait_for_audio_tail();

        if self.state != SyncState::Terminated {
            self.report.end = EndReason::EndOfStream;
        }
        Ok(())
    }

    /// 等设备把已入队的音频播完（有上限），避免结尾被截断
    fn wait_for_audio_tail(&mut self) {
        let pending = self.sink.pending_audio();
        if pending.is_zero() {
            return;
        }
        debug!("等待音频尾部播放: {:?}", pending);
        let give_up = Instant::now() + pending + AUDIO_TAIL_GRACE;

        while self.state != SyncState::Terminated {
            if self.state == SyncState::Paused {
                self.wait_while_paused();
                continue;
            }

            let pending = self.sink.pending_audio();
            let now = Instant::now();
            if pending.is_zero() || now >= give_up {
                return;
            }

            let tick = pending.min(AUDIO_TAIL_POLL).min(give_up - now);
            match self.commands.recv_timeout(tick) {
                Ok(command) => self.apply(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.apply(TransportCommand::Quit),
            }
        }
    }

    fn terminate(&mut self) {
        self.state = SyncState::Terminated;
        self.status.set_state(PlaybackState::Stopped);
    }
}

/// 送包；单包解码错误只记录并跳过
fn submit_packet<D: StreamDecoder>(
    decoder: &mut D,
    packet: &D::Packet,
    kind: StreamKind,
    report: &mut PlaybackReport,
) -> Result<()> {
    match decoder.submit(packet) {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            warn!("⚠️  {}包解码失败（已跳过）: {}", kind, e);
            report.decode_errors += 1;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn flush_decoder<D: StreamDecoder>(
    decoder: &mut D,
    kind: StreamKind,
    report: &mut PlaybackReport,
) -> Result<()> {
    match decoder.submit_eof() {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            warn!("⚠️  {}解码器冲刷失败: {}", kind, e);
            report.decode_errors += 1;
            Ok(())
        }
        Err(e) => Err(e),
    }
}
