use crate::core::{TransportCommand, UiEvent};
use egui::{pos2, vec2, Pos2, Rect};
use log::debug;

/// 控制按钮边长占控制条高度的比例
const BUTTON_RATIO: f32 = 0.7;
/// 两个按钮之间的半间距
const BUTTON_HALF_GAP: f32 = 8.0;

/// 窗口布局：视频区 + 底部控制条里的播放/暂停按钮
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLayout {
    pub video: Rect,
    pub strip: Option<Rect>,
    pub play: Rect,
    pub pause: Rect,
}

impl ControlLayout {
    pub fn compute(window: Rect, strip_height: f32) -> Self {
        let strip_height = strip_height.clamp(0.0, window.height());
        if strip_height <= 0.0 {
            return Self {
                video: window,
                strip: None,
                play: Rect::NOTHING,
                pause: Rect::NOTHING,
            };
        }

        let video = Rect::from_min_max(window.min, pos2(window.max.x, window.max.y - strip_height));
        let strip = Rect::from_min_max(pos2(window.min.x, video.max.y), window.max);

        let side = strip_height * BUTTON_RATIO;
        let center = strip.center();
        let play = Rect::from_center_size(
            pos2(center.x - BUTTON_HALF_GAP - side / 2.0, center.y),
            vec2(side, side),
        );
        let pause = Rect::from_center_size(
            pos2(center.x + BUTTON_HALF_GAP + side / 2.0, center.y),
            vec2(side, side),
        );

        Self {
            video,
            strip: Some(strip),
            play,
            pause,
        }
    }
}

/// 传输控制器 - 把窗口事件映射成 Play/Pause/Quit
///
/// 布局在创建时按窗口几何算一次，之后不再变化。
pub struct TransportController {
    layout: ControlLayout,
    paused: bool,
}

impl TransportController {
    pub fn new(window: Rect, strip_height: f32) -> Self {
        let layout = ControlLayout::compute(window, strip_height);
        debug!("控制条布局: {:?}", layout);
        Self {
            layout,
            paused: false,
        }
    }

    pub fn layout(&self) -> &ControlLayout {
        &self.layout
    }

    pub fn on_event(&mut self, event: UiEvent) -> Option<TransportCommand> {
        let command = match event {
            UiEvent::Quit => Some(TransportCommand::Quit),
            UiEvent::PointerDown { x, y } => self.hit_test(pos2(x, y)),
            UiEvent::TogglePlayback => Some(if self.paused {
                TransportCommand::Play
            } else {
                TransportCommand::Pause
            }),
        };

        match command {
            Some(TransportCommand::Play) => self.paused = false,
            Some(TransportCommand::Pause) => self.paused = true,
            _ => {}
        }
        command
    }

    fn hit_test(&self, point: Pos2) -> Option<TransportCommand> {
        if self.layout.play.contains(point) {
            Some(TransportCommand::Play)
        } else if self.layout.pause.contains(point) {
            Some(TransportCommand::Pause)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(640.0, 410.0))
    }

    fn down(p: Pos2) -> UiEvent {
        UiEvent::PointerDown { x: p.x, y: p.y }
    }

    #[test]
    fn test_layout_reserves_strip() {
        let layout = ControlLayout::compute(window(), 50.0);
        assert_eq!(layout.video.height(), 360.0);
        assert_eq!(layout.strip.unwrap().height(), 50.0);
        assert!(layout.strip.unwrap().contains(layout.play.center()));
        assert!(layout.strip.unwrap().contains(layout.pause.center()));
        assert!(!layout.play.intersects(layout.pause));
    }

    #[test]
    fn test_layout_without_strip_uses_full_window() {
        let layout = ControlLayout::compute(window(), 0.0);
        assert_eq!(layout.video, window());
        assert!(layout.strip.is_none());
        assert!(!layout.play.contains(pos2(320.0, 400.0)));
    }

    #[test]
    fn test_pointer_hits_map_to_commands() {
        let mut transport = TransportController::new(window(), 50.0);
        let play = transport.layout().play.center();
        let pause = transport.layout().pause.center();

        assert_eq!(transport.on_event(down(pause)), Some(TransportCommand::Pause));
        assert_eq!(transport.on_event(down(play)), Some(TransportCommand::Play));
        assert_eq!(transport.on_event(down(pos2(10.0, 10.0))), None);
    }

    #[test]
    fn test_quit_always_maps_to_quit() {
        let mut transport = TransportController::new(window(), 0.0);
        assert_eq!(transport.on_event(UiEvent::Quit), Some(TransportCommand::Quit));
    }

    #[test]
    fn test_toggle_follows_last_command() {
        let mut transport = TransportController::new(window(), 50.0);
        assert_eq!(
            transport.on_event(UiEvent::TogglePlayback),
            Some(TransportCommand::Pause)
        );
        assert_eq!(
            transport.on_event(UiEvent::TogglePlayback),
            Some(TransportCommand::Play)
        );

        let pause = transport.layout().pause.center();
        transport.on_event(down(pause));
        assert_eq!(
            transport.on_event(UiEvent::TogglePlayback),
            Some(TransportCommand::Play)
        );
    }
}
