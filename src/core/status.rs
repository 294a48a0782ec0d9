use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::core::PlaybackState;

/// 播放器状态快照（UI 线程读取）
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub position_ms: i64,
    pub frames_presented: u64,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            state: PlaybackState::Playing,
            position_ms: 0,
            frames_presented: 0,
        }
    }
}

/// 播放线程写、UI 线程读的共享状态
#[derive(Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Mutex<PlayerStatus>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlayerStatus {
        *self.inner.lock()
    }

    pub fn set_state(&self, state: PlaybackState) {
        self.inner.lock().state = state;
    }

    pub fn record_frame(&self, position_ms: i64) {
        let mut status = self.inner.lock();
        status.position_ms = position_ms;
        status.frames_presented += 1;
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().state == PlaybackState::Stopped
    }
}
