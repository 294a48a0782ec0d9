use std::time::{Duration, Instant};

use crate::core::TimeBase;

/// 播放时钟 - 把视频帧 PTS 换算成墙上时间截止点
///
/// 原点在第一帧视频解码成功时记录一次，之后不再重置。
/// 暂停期间的时长会在恢复时整体平移到原点上，
/// 这样恢复后不会出现追帧（暂停时长不计入节拍）。
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    time_base: TimeBase,
    origin: Option<Instant>,
    paused_since: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(time_base: TimeBase) -> Self {
        Self {
            time_base,
            origin: None,
            paused_since: None,
        }
    }

    #[cfg(test)]
    pub fn origin(&self) -> Option<Instant> {
        self.origin
    }

    /// 记录原点，仅第一次调用生效；返回是否本次设置
    pub fn start_at(&mut self, now: Instant) -> bool {
        if self.origin.is_some() {
            return false;
        }
        self.origin = Some(now);
        true
    }

    /// targetWallTime = origin + pts * timeBase
    ///
    /// 时钟未启动或 PTS 大到无法表示时返回 None，调用方按“立即呈现”处理。
    pub fn deadline(&self, pts: i64) -> Option<Instant> {
        let origin = self.origin?;
        origin.checked_add(self.time_base.duration(pts)?)
    }

    /// 距离截止点还需等待多久，已到期返回 None
    pub fn delay_at(&self, pts: i64, now: Instant) -> Option<Duration> {
        let target = self.deadline(pts)?;
        if target > now {
            Some(target - now)
        } else {
            None
        }
    }

    /// 已超过截止点多久，未到期或时钟未启动返回 None
    pub fn lateness_at(&self, pts: i64, now: Instant) -> Option<Duration> {
        let target = self.deadline(pts)?;
        if now > target {
            Some(now - target)
        } else {
            None
        }
    }

    /// 暂停（重复调用无副作用）
    pub fn pause_at(&mut self, now: Instant) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    /// 恢复播放，原点后移暂停的时长
    pub fn resume_at(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            if let Some(origin) = self.origin.as_mut() {
                *origin += now.saturating_duration_since(since);
            }
        }
    }

    /// 当前播放位置（毫秒），用于 UI 展示
    pub fn position_ms(&self, now: Instant) -> i64 {
        match self.origin {
            Some(origin) => {
                let reference = self.paused_since.unwrap_or(now);
                reference.saturating_duration_since(origin).as_millis() as i64
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> PlaybackClock {
        PlaybackClock::new(TimeBase::new(1, 1000))
    }

    #[test]
    fn test_origin_is_captured_once() {
        let mut clock = clock();
        let t0 = Instant::now();
        assert!(clock.deadline(0).is_none());
        assert!(clock.start_at(t0));
        assert!(!clock.start_at(t0 + Duration::from_secs(5)));
        assert_eq!(clock.origin(), Some(t0));
    }

    #[test]
    fn test_deadline_and_delay() {
        let mut clock = clock();
        let t0 = Instant::now();
        clock.start_at(t0);
        assert_eq!(clock.deadline(250), Some(t0 + Duration::from_millis(250)));
        assert_eq!(
            clock.delay_at(250, t0 + Duration::from_millis(100)),
            Some(Duration::from_millis(150))
        );
        assert_eq!(clock.delay_at(250, t0 + Duration::from_millis(250)), None);
        assert_eq!(
            clock.lateness_at(250, t0 + Duration::from_millis(300)),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_resume_excludes_paused_time() {
        let mut clock = clock();
        let t0 = Instant::now();
        clock.start_at(t0);
        clock.pause_at(t0 + Duration::from_millis(100));
        // 重复暂停不应改变暂停起点
        clock.pause_at(t0 + Duration::from_millis(300));
        clock.resume_at(t0 + Duration::from_millis(600));
        assert_eq!(clock.origin(), Some(t0 + Duration::from_millis(500)));
        assert_eq!(clock.deadline(200), Some(t0 + Duration::from_millis(700)));
    }

    #[test]
    fn test_unrepresentable_deadline_means_present_now() {
        let mut clock = PlaybackClock::new(TimeBase::new(i32::MAX, 1));
        let t0 = Instant::now();
        clock.start_at(t0);
        assert_eq!(clock.deadline(i64::MAX), None);
        assert_eq!(clock.delay_at(i64::MAX, t0), None);
        assert_eq!(clock.lateness_at(i64::MAX, t0), None);
    }

    #[test]
    fn test_resume_without_pause_is_noop() {
        let mut clock = clock();
        let t0 = Instant::now();
        clock.start_at(t0);
        clock.resume_at(t0 + Duration::from_secs(1));
        assert_eq!(clock.origin(), Some(t0));
    }

    #[test]
    fn test_position_freezes_while_paused() {
        let mut clock = clock();
        let t0 = Instant::now();
        assert_eq!(clock.position_ms(t0), 0);
        clock.start_at(t0);
        clock.pause_at(t0 + Duration::from_millis(400));
        assert_eq!(clock.position_ms(t0 + Duration::from_secs(3)), 400);
    }
}
