//! 测试用的脚本化数据源、解码器、转换器和呈现端

use crate::core::{AudioBuffer, PlayerError, Result, StreamKind, VideoFrame};
use crate::player::stages::{FrameConverter, PacketSource, PresentationSink, StreamDecoder};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FakePacket {
    pub pts: i64,
    pub samples: usize,
    pub malformed: bool,
}

enum Entry {
    Packet(StreamKind, FakePacket),
    Fail,
}

#[derive(Default)]
pub struct ScriptedSource {
    entries: VecDeque<Entry>,
    pub reads: usize,
    pub served: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交错的音视频：每个视频包之后跟上覆盖同一时间段的音频包
    pub fn interleaved(video_frames: i64, fps: i64, sample_rate: usize, audio_frame: usize) -> Self {
        let mut source = Self::new();
        let mut audio_written = 0usize;
        for i in 0..video_frames {
            source = source.video(i);
            let audio_due = sample_rate * (i as usize + 1) / fps as usize;
            while audio_written < audio_due {
                source = source.audio(audio_frame);
                audio_written += audio_frame;
            }
        }
        source
    }

    pub fn video(mut self, pts: i64) -> Self {
        self.entries.push_back(Entry::Packet(
            StreamKind::Video,
            FakePacket {
                pts,
                samples: 0,
                malformed: false,
            },
        ));
        self
    }

    pub fn malformed_video(mut self, pts: i64) -> Self {
        self.entries.push_back(Entry::Packet(
            StreamKind::Video,
            FakePacket {
                pts,
                samples: 0,
                malformed: true,
            },
        ));
        self
    }

    pub fn audio(mut self, samples: usize) -> Self {
        self.entries.push_back(Entry::Packet(
            StreamKind::Audio,
            FakePacket {
                pts: 0,
                samples,
                malformed: false,
            },
        ));
        self
    }

    pub fn read_error(mut self) -> Self {
        self.entries.push_back(Entry::Fail);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn audio_samples(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match e {
                Entry::Packet(StreamKind::Audio, p) => p.samples,
                _ => 0,
            })
            .sum()
    }
}

impl PacketSource for ScriptedSource {
    type Packet = FakePacket;

    fn next_packet(&mut self) -> Result<Option<(StreamKind, FakePacket)>> {
        self.reads += 1;
        match self.entries.pop_front() {
            Some(Entry::Packet(kind, packet)) => {
                self.served += 1;
                Ok(Some((kind, packet)))
            }
            Some(Entry::Fail) => Err(PlayerError::IoError("磁盘读取失败".into())),
            None => Ok(None),
        }
    }
}

/// 模拟有重排序延迟的视频解码器：前 `delay` 个包不出帧，EOF 后吐出剩余帧
pub struct FakeVideoDecoder {
    delay: usize,
    pending: VecDeque<i64>,
    ready: VecDeque<i64>,
}

impl FakeVideoDecoder {
    pub fn with_delay(delay: usize) -> Self {
        Self {
            delay,
            pending: VecDeque::new(),
            ready: VecDeque::new(),
        }
    }
}

impl StreamDecoder for FakeVideoDecoder {
    type Packet = FakePacket;
    type Frame = i64;

    fn submit(&mut self, packet: &FakePacket) -> Result<()> {
        if packet.malformed {
            return Err(PlayerError::DecodeError("invalid NAL unit".into()));
        }
        self.pending.push_back(packet.pts);
        while self.pending.len() > self.delay {
            if let Some(pts) = self.pending.pop_front() {
                self.ready.push_back(pts);
            }
        }
        Ok(())
    }

    fn submit_eof(&mut self) -> Result<()> {
        self.ready.extend(self.pending.drain(..));
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<i64>> {
        Ok(self.ready.pop_front())
    }
}

/// 每个包出一帧；大包拆成两帧，模拟一包多帧
#[derive(Default)]
pub struct FakeAudioDecoder {
    ready: VecDeque<usize>,
}

impl StreamDecoder for FakeAudioDecoder {
    type Packet = FakePacket;
    type Frame = usize;

    fn submit(&mut self, packet: &FakePacket) -> Result<()> {
        if packet.malformed {
            return Err(PlayerError::DecodeError("corrupt frame header".into()));
        }
        if packet.samples > 2048 {
            let half = packet.samples / 2;
            self.ready.push_back(half);
            self.ready.push_back(packet.samples - half);
        } else {
            self.ready.push_back(packet.samples);
        }
        Ok(())
    }

    fn submit_eof(&mut self) -> Result<()> {
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<usize>> {
        Ok(self.ready.pop_front())
    }
}

pub struct FakePixelConverter {
    pub width: u32,
    pub height: u32,
}

impl FrameConverter for FakePixelConverter {
    type Input = i64;
    type Output = VideoFrame;

    fn convert(&mut self, pts: &i64) -> Result<VideoFrame> {
        Ok(VideoFrame {
            pts: Some(*pts),
            width: self.width,
            height: self.height,
            data: vec![0; VideoFrame::expected_len(self.width, self.height)],
        })
    }
}

/// 固定延迟的重采样器：第一次转换扣下 `delay` 个采样，drain 时补回
pub struct FakeResampler {
    delay: usize,
    held: usize,
    pub sample_rate: u32,
}

impl FakeResampler {
    pub fn with_delay(delay: usize, sample_rate: u32) -> Self {
        Self {
            delay,
            held: 0,
            sample_rate,
        }
    }

    fn buffer(&self, frames: usize) -> AudioBuffer {
        AudioBuffer {
            sample_rate: self.sample_rate,
            samples: vec![0; frames * AudioBuffer::CHANNELS],
        }
    }
}

impl FrameConverter for FakeResampler {
    type Input = usize;
    type Output = AudioBuffer;

    fn convert(&mut self, samples: &usize) -> Result<AudioBuffer> {
        let total = self.held + samples;
        self.held = total.min(self.delay);
        Ok(self.buffer(total - self.held))
    }

    fn drain(&mut self) -> Result<Option<AudioBuffer>> {
        if self.held == 0 {
            return Ok(None);
        }
        let frames = std::mem::take(&mut self.held);
        Ok(Some(self.buffer(frames)))
    }
}

#[derive(Debug, Clone)]
pub struct Presented {
    pub pts: Option<i64>,
    pub at: Instant,
    pub len: usize,
    pub width: u32,
    pub height: u32,
}

/// 记录所有呈现动作；`present_cost` 模拟慢速显示
///
/// `device_clock` 打开时按实时速率模拟设备消费已入队的音频。
#[derive(Default)]
pub struct RecordingSink {
    pub presented: Vec<Presented>,
    pub audio_bytes: usize,
    pub audio_frames: usize,
    pub audio_buffers: usize,
    pub present_cost: Duration,
    pub device_clock: bool,
    played_until: Option<Instant>,
}

impl PresentationSink for RecordingSink {
    fn present_video(&mut self, frame: &VideoFrame) -> Result<()> {
        self.presented.push(Presented {
            pts: frame.pts,
            at: Instant::now(),
            len: frame.data.len(),
            width: frame.width,
            height: frame.height,
        });
        if !self.present_cost.is_zero() {
            std::thread::sleep(self.present_cost);
        }
        Ok(())
    }

    fn queue_audio(&mut self, buffer: &AudioBuffer) -> Result<()> {
        self.audio_bytes += buffer.byte_len();
        self.audio_frames += buffer.frames();
        self.audio_buffers += 1;

        if self.device_clock && buffer.sample_rate > 0 {
            let length = Duration::from_secs_f64(buffer.frames() as f64 / buffer.sample_rate as f64);
            let now = Instant::now();
            let start = self.played_until.filter(|t| *t > now).unwrap_or(now);
            self.played_until = Some(start + length);
        }
        Ok(())
    }

    fn pending_audio(&self) -> Duration {
        self.played_until
            .map(|t| t.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }
}
