use crate::core::{AudioBuffer, PlayerError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, SupportedStreamConfigRange};
use crossbeam::queue::SegQueue;
use log::{debug, error, info};
use std::sync::Arc;

/// 音频输出 - 使用 cpal 持续消费 s16 交错立体声队列
///
/// 调用方只负责追加；设备回调按自己的节奏取数据，取空时补静音。
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    queue: Arc<SegQueue<i16>>,
}

impl AudioOutput {
    /// 打开默认输出设备，采样率与源一致
    pub fn new(sample_rate: u32) -> Result<Self> {
        let channels = AudioBuffer::CHANNELS as u16;
        info!("初始化音频输出: {} Hz, {} 声道", sample_rate, channels);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::OutputDeviceError("无法找到音频输出设备".to_string()))?;

        debug!("使用音频设备: {}", device.name().unwrap_or_default());

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let supported = device
            .supported_output_configs()
            .map_err(|e| PlayerError::OutputDeviceError(format!("无法获取支持的音频配置: {}", e)))?
            .any(|range| Self::is_config_compatible(&config, &range));

        if !supported {
            return Err(PlayerError::OutputDeviceError(format!(
                "音频设备不支持 {} Hz, {} 声道",
                sample_rate, channels
            )));
        }

        Ok(Self {
            device,
            config,
            stream: None,
            queue: Arc::new(SegQueue::new()),
        })
    }

    fn is_config_compatible(config: &StreamConfig, supported: &SupportedStreamConfigRange) -> bool {
        let rate_in_range = config.sample_rate.0 >= supported.min_sample_rate().0
            && config.sample_rate.0 <= supported.max_sample_rate().0;

        rate_in_range && config.channels == supported.channels()
    }

    /// 开始播放
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let queue = self.queue.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        *sample = queue.pop().map(s16_to_f32).unwrap_or(0.0);
                    }
                },
                move |err| {
                    error!("音频流错误: {}", err);
                },
                None,
            )
            .map_err(|e| PlayerError::OutputDeviceError(format!("创建音频流失败: {}", e)))?;

        stream
            .play()
            .map_err(|e| PlayerError::OutputDeviceError(format!("启动音频流失败: {}", e)))?;

        self.stream = Some(stream);
        info!("音频输出已启动");

        Ok(())
    }

    /// 停止播放
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("音频输出已停止");
        }
    }

    /// 追加一段 PCM
    pub fn write_buffer(&self, buffer: &AudioBuffer) {
        for sample in &buffer.samples {
            self.queue.push(*sample);
        }
    }

    /// 队列中尚未播放的采样数（所有声道合计）
    pub fn buffered_samples(&self) -> usize {
        self.queue.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn s16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s16_to_f32_range() {
        assert_eq!(s16_to_f32(0), 0.0);
        assert_eq!(s16_to_f32(i16::MIN), -1.0);
        assert!(s16_to_f32(i16::MAX) < 1.0);
    }
}
