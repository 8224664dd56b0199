//! Digital button actuator and its composite kinds
//!
//! [`Button`] owns the edge logic shared by everything bound to a digital
//! control (single-fire presses, dual-stage alternation, taps); the
//! [`ButtonKind`] decides what a press or release actually does.

use crate::backend::parse_keys;
use crate::mapping::actuators::filters::FractionalCarry;
use crate::mapping::actuators::macros::MacroButton;
use crate::mapping::actuators::task::Task;
use crate::mapping::actuators::{check_positive, Actuate, ActuatorError, Context};
use crate::steamcon::types::InputEvent;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// What a button does when it fires
#[derive(Debug)]
pub enum ButtonKind {
    /// Explicit no-op
    None,
    /// Hold keys (or mouse buttons) while pressed
    Key { keys: Vec<String>, ctx: Context },
    /// Enter a layer on press, leave it on release
    Layer {
        name: String,
        transparent: bool,
        ctx: Context,
    },
    /// Press (or release) another button on press
    Toggle {
        target: Box<Button>,
        press_else_release: bool,
    },
    /// Tap another button on both edges
    Doubler(Box<Button>),
    /// Fan out to several buttons
    Many(Vec<Button>),
    Scroll(ScrollButton),
    LongPress(LongPress),
    Macro(MacroButton),
}

impl ButtonKind {
    fn press(&mut self) -> Result<(), ActuatorError> {
        match self {
            ButtonKind::None => {}
            ButtonKind::Key { keys, ctx } => ctx.press(keys),
            ButtonKind::Layer {
                name,
                transparent,
                ctx,
            } => ctx.enter_layer(name, *transparent),
            ButtonKind::Toggle {
                target,
                press_else_release,
            } => {
                if *press_else_release {
                    target.press()?;
                } else {
                    target.release()?;
                }
            }
            ButtonKind::Doubler(target) => target.tap()?,
            ButtonKind::Many(buttons) => {
                for button in buttons.iter_mut() {
                    button.press()?;
                }
            }
            ButtonKind::Scroll(scroll) => scroll.press()?,
            ButtonKind::LongPress(long_press) => long_press.press()?,
            ButtonKind::Macro(macro_button) => macro_button.press()?,
        }
        Ok(())
    }

    fn release(&mut self, held: Duration) -> Result<(), ActuatorError> {
        match self {
            ButtonKind::None | ButtonKind::Toggle { .. } => {}
            ButtonKind::Key { keys, ctx } => ctx.release(keys),
            ButtonKind::Layer { name, ctx, .. } => ctx.exit_layer(name),
            ButtonKind::Doubler(target) => target.tap()?,
            ButtonKind::Many(buttons) => {
                for button in buttons.iter_mut() {
                    button.release()?;
                }
            }
            ButtonKind::Scroll(scroll) => scroll.release(),
            ButtonKind::LongPress(long_press) => long_press.release(held)?,
            ButtonKind::Macro(macro_button) => macro_button.release()?,
        }
        Ok(())
    }

    /// Stop tasks and release children
    fn release_all(&mut self) {
        match self {
            ButtonKind::None | ButtonKind::Key { .. } | ButtonKind::Layer { .. } => {}
            ButtonKind::Toggle { target, .. } | ButtonKind::Doubler(target) => target.release_all(),
            ButtonKind::Many(buttons) => buttons.iter_mut().for_each(Button::release_all),
            ButtonKind::Scroll(scroll) => scroll.release(),
            ButtonKind::LongPress(long_press) => long_press.release_all(),
            ButtonKind::Macro(macro_button) => macro_button.release_all(),
        }
    }
}

/// Edge logic around a [`ButtonKind`]
#[derive(Debug)]
pub struct Button {
    kind: ButtonKind,
    dual_stage: bool,
    repetitious: bool,
    is_pressed: bool,
    second_press: bool,
    pressed_at: Option<Instant>,
    time_held: Option<Duration>,
}

impl Button {
    pub fn new(kind: ButtonKind) -> Self {
        Self {
            kind,
            dual_stage: false,
            repetitious: false,
            is_pressed: false,
            second_press: false,
            pressed_at: None,
            time_held: None,
        }
    }

    pub fn none() -> Self {
        Self::new(ButtonKind::None)
    }

    /// Hold a key combo such as `"shift+w"`
    pub fn key(ctx: &Context, combo: &str) -> Self {
        Self::new(ButtonKind::Key {
            keys: parse_keys(combo),
            ctx: ctx.clone(),
        })
    }

    /// Enter `name` while held
    pub fn layer(ctx: &Context, name: &str, transparent: bool) -> Self {
        Self::new(ButtonKind::Layer {
            name: name.to_string(),
            transparent,
            ctx: ctx.clone(),
        })
    }

    /// Alternate between firing press and release on successive presses
    pub fn with_dual_stage(mut self) -> Self {
        self.dual_stage = true;
        self
    }

    /// Fire on every press and release, even repeated ones
    pub fn with_repetition(mut self) -> Self {
        self.repetitious = true;
        self
    }

    pub fn kind(&self) -> &ButtonKind {
        &self.kind
    }

    pub fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, ButtonKind::None)
    }

    pub fn press(&mut self) -> Result<(), ActuatorError> {
        if self.repetitious {
            return self.kind.press();
        }
        if self.is_pressed {
            return Ok(());
        }
        self.is_pressed = true;
        self.pressed_at = Some(Instant::now());
        let result = if self.dual_stage && self.second_press {
            self.kind.release(Duration::ZERO)
        } else {
            self.kind.press()
        };
        self.second_press = !self.second_press;
        result
    }

    pub fn release(&mut self) -> Result<(), ActuatorError> {
        let held = self.held_duration();
        if self.repetitious {
            return self.kind.release(held);
        }
        if !self.is_pressed {
            return Ok(());
        }
        self.is_pressed = false;
        self.pressed_at = None;
        if self.dual_stage {
            return Ok(());
        }
        self.kind.release(held)
    }

    /// Press and release; a held button is released first and pressed again
    pub fn tap(&mut self) -> Result<(), ActuatorError> {
        if self.is_pressed {
            self.release()?;
            self.press()
        } else {
            self.press()?;
            self.release()
        }
    }

    fn held_duration(&mut self) -> Duration {
        self.time_held
            .take()
            .or_else(|| self.pressed_at.map(|at| at.elapsed()))
            .unwrap_or(Duration::ZERO)
    }
}

impl Actuate for Button {
    fn do_event(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        if !event.is_button() {
            return Err(ActuatorError::shape("button", event));
        }
        if event.is_press() {
            self.press()
        } else if event.is_release() {
            self.time_held = event.time_held();
            self.release()
        } else {
            Ok(())
        }
    }

    fn release_all(&mut self) {
        let result = if self.dual_stage {
            // Second stage still holds whatever the first press engaged
            let engaged = self.second_press;
            self.is_pressed = false;
            self.second_press = false;
            if engaged {
                self.kind.release(Duration::ZERO)
            } else {
                Ok(())
            }
        } else {
            self.release()
        };
        if let Err(e) = result {
            warn!("Failed to release button: {}", e);
        }
        self.kind.release_all();
    }
}

/// Scroll once per press, or continuously while held
#[derive(Debug)]
pub struct ScrollButton {
    ctx: Context,
    amount: f64,
    as_clicks: bool,
    continuous: bool,
    task: Option<Task>,
}

impl ScrollButton {
    pub const REPEAT_INTERVAL: Duration = Duration::from_millis(10);

    pub fn new(ctx: &Context, amount: f64, as_clicks: bool, continuous: bool) -> Self {
        Self {
            ctx: ctx.clone(),
            amount,
            as_clicks,
            continuous,
            task: None,
        }
    }

    fn press(&mut self) -> Result<(), ActuatorError> {
        if !self.continuous {
            self.ctx.scroll(self.amount.round() as i32, self.as_clicks);
            return Ok(());
        }
        self.release();
        let ctx = self.ctx.clone();
        let (amount, as_clicks) = (self.amount, self.as_clicks);
        self.task = Some(Task::spawn("scroll-repeat", move |token| {
            let mut carry = FractionalCarry::default();
            while token.sleep(Self::REPEAT_INTERVAL) {
                ctx.scroll(carry.take_one(amount), as_clicks);
            }
        })?);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
    }
}

/// Short press / long press split
#[derive(Debug)]
pub struct LongPress {
    short: Box<Button>,
    long: Arc<Mutex<Button>>,
    threshold: Duration,
    hold_long: bool,
    timer: Option<Task>,
}

impl LongPress {
    pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(500);

    /// With `hold_long`, the long button is pressed as soon as the threshold
    /// elapses and held until release; otherwise one of the two is tapped on
    /// release depending on how long the control was held.
    pub fn new(
        short: Button,
        long: Button,
        threshold: Duration,
        hold_long: bool,
    ) -> Result<Self, ActuatorError> {
        check_positive("long press threshold", threshold.as_secs_f64())?;
        Ok(Self {
            short: Box::new(short),
            long: Arc::new(Mutex::new(long)),
            threshold,
            hold_long,
            timer: None,
        })
    }

    fn lock_long(long: &Mutex<Button>) -> MutexGuard<'_, Button> {
        long.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn press(&mut self) -> Result<(), ActuatorError> {
        if !self.hold_long {
            return Ok(());
        }
        self.cancel_timer();
        let long = Arc::clone(&self.long);
        let threshold = self.threshold;
        self.timer = Some(Task::spawn("long-press", move |token| {
            if token.sleep(threshold) {
                debug!("Long press threshold reached");
                if let Err(e) = Self::lock_long(&long).press() {
                    warn!("Failed to press long button: {}", e);
                }
            }
        })?);
        Ok(())
    }

    fn release(&mut self, held: Duration) -> Result<(), ActuatorError> {
        if self.hold_long {
            // Joined before inspecting, so the timer cannot fire afterwards
            self.cancel_timer();
            let mut long = Self::lock_long(&self.long);
            if long.is_pressed() {
                long.release()
            } else {
                drop(long);
                self.short.tap()
            }
        } else if held < self.threshold {
            self.short.tap()
        } else {
            Self::lock_long(&self.long).tap()
        }
    }

    fn release_all(&mut self) {
        self.cancel_timer();
        self.short.release_all();
        Self::lock_long(&self.long).release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OutputCall;
    use crate::mapping::actuators::test_support::{context, keys};
    use crate::mapping::actuators::SideEffect;
    use crate::steamcon::types::{LogicalInput, Position};
    use std::thread;

    fn press() -> InputEvent {
        InputEvent::button_press(LogicalInput::A)
    }

    fn release(ms: u64) -> InputEvent {
        press().as_release(Duration::from_millis(ms))
    }

    #[test]
    fn test_press_fires_once() {
        let (ctx, mock, _) = context();
        let mut button = Button::key(&ctx, "a");

        button.do_event(&press()).unwrap();
        button.do_event(&press()).unwrap();
        button.do_event(&release(10)).unwrap();
        button.do_event(&release(10)).unwrap();

        assert_eq!(
            mock.calls(),
            vec![OutputCall::Press(keys("a")), OutputCall::Release(keys("a"))]
        );
    }

    #[test]
    fn test_repetitious_fires_every_time() {
        let (ctx, mock, _) = context();
        let mut button = Button::key(&ctx, "a").with_repetition();
        button.press().unwrap();
        button.press().unwrap();
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn test_dual_stage_alternates() {
        let (ctx, mock, _) = context();
        let mut button = Button::key(&ctx, "ctrl").with_dual_stage();

        button.tap().unwrap();
        assert_eq!(mock.held_keys(), keys("ctrl"));
        button.tap().unwrap();
        assert!(mock.held_keys().is_empty());
        assert_eq!(
            mock.calls(),
            vec![OutputCall::Press(keys("ctrl")), OutputCall::Release(keys("ctrl"))]
        );
    }

    #[test]
    fn test_dual_stage_release_all_disengages() {
        let (ctx, mock, _) = context();
        let mut button = Button::key(&ctx, "ctrl").with_dual_stage();
        button.tap().unwrap();
        button.release_all();
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_tap_while_held() {
        let (ctx, mock, _) = context();
        let mut button = Button::key(&ctx, "a");
        button.press().unwrap();
        button.tap().unwrap();
        assert!(button.is_pressed());
        assert_eq!(
            mock.calls(),
            vec![
                OutputCall::Press(keys("a")),
                OutputCall::Release(keys("a")),
                OutputCall::Press(keys("a")),
            ]
        );
    }

    #[test]
    fn test_rejects_non_button_events() {
        let (ctx, _, _) = context();
        let mut button = Button::key(&ctx, "a");
        let result = button.do_event(&InputEvent::stick(Position::new(0, 100)));
        assert!(matches!(result, Err(ActuatorError::InvalidEventShape { .. })));
    }

    #[test]
    fn test_pad_hold_is_ignored() {
        let (ctx, mock, _) = context();
        let mut button = Button::key(&ctx, "a");
        let touch = InputEvent::trackpad_press(LogicalInput::RPadTouch, Position::new(5, 5));
        button.do_event(&touch).unwrap();
        button.do_event(&touch.as_hold()).unwrap();
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_layer_button_queues_effects() {
        let (ctx, _, effects) = context();
        let mut button = Button::layer(&ctx, "menu", false);
        button.do_event(&press()).unwrap();
        button.do_event(&release(5)).unwrap();
        assert_eq!(
            effects.try_iter().collect::<Vec<_>>(),
            vec![
                SideEffect::EnterLayer { name: "menu".into(), transparent: false },
                SideEffect::ExitLayer { name: "menu".into() },
            ]
        );
    }

    #[test]
    fn test_toggle_and_doubler() {
        let (ctx, mock, _) = context();
        let mut toggle = Button::new(ButtonKind::Toggle {
            target: Box::new(Button::key(&ctx, "t")),
            press_else_release: true,
        });
        toggle.tap().unwrap();
        assert_eq!(mock.held_keys(), keys("t"));

        mock.clear();
        let mut doubler = Button::new(ButtonKind::Doubler(Box::new(Button::key(&ctx, "d"))));
        doubler.tap().unwrap();
        assert_eq!(mock.calls().len(), 4);
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_many_and_release_all() {
        let (ctx, mock, _) = context();
        let mut many = Button::new(ButtonKind::Many(vec![
            Button::key(&ctx, "a"),
            Button::key(&ctx, "b"),
        ]));
        many.press().unwrap();
        assert_eq!(mock.held_keys(), vec!["a".to_string(), "b".to_string()]);
        many.release_all();
        assert!(mock.held_keys().is_empty());
    }

    #[test]
    fn test_long_press_by_time_held() {
        let (ctx, mock, _) = context();
        let long_press = LongPress::new(
            Button::key(&ctx, "s"),
            Button::key(&ctx, "l"),
            Duration::from_millis(500),
            false,
        )
        .unwrap();
        let mut button = Button::new(ButtonKind::LongPress(long_press));

        button.do_event(&press()).unwrap();
        button.do_event(&release(100)).unwrap();
        button.do_event(&press()).unwrap();
        button.do_event(&release(800)).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                OutputCall::Press(keys("s")),
                OutputCall::Release(keys("s")),
                OutputCall::Press(keys("l")),
                OutputCall::Release(keys("l")),
            ]
        );
    }

    #[test]
    fn test_held_long_press_fires_after_threshold() {
        let (ctx, mock, _) = context();
        let long_press = LongPress::new(
            Button::key(&ctx, "s"),
            Button::key(&ctx, "l"),
            Duration::from_millis(20),
            true,
        )
        .unwrap();
        let mut button = Button::new(ButtonKind::LongPress(long_press));

        button.do_event(&press()).unwrap();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(mock.held_keys(), keys("l"));

        button.do_event(&release(150)).unwrap();
        assert_eq!(
            mock.calls(),
            vec![OutputCall::Press(keys("l")), OutputCall::Release(keys("l"))]
        );
    }

    #[test]
    fn test_held_long_press_cancelled_by_early_release() {
        let (ctx, mock, _) = context();
        let long_press = LongPress::new(
            Button::key(&ctx, "s"),
            Button::key(&ctx, "l"),
            Duration::from_millis(200),
            true,
        )
        .unwrap();
        let mut button = Button::new(ButtonKind::LongPress(long_press));

        button.do_event(&press()).unwrap();
        button.do_event(&release(5)).unwrap();
        thread::sleep(Duration::from_millis(300));

        assert_eq!(
            mock.calls(),
            vec![OutputCall::Press(keys("s")), OutputCall::Release(keys("s"))]
        );
    }

    #[test]
    fn test_long_press_rejects_zero_threshold() {
        let (ctx, _, _) = context();
        let result = LongPress::new(Button::key(&ctx, "s"), Button::none(), Duration::ZERO, false);
        assert!(matches!(result, Err(ActuatorError::Config(_))));
    }

    #[test]
    fn test_single_scroll() {
        let (ctx, mock, _) = context();
        let mut button = Button::new(ButtonKind::Scroll(ScrollButton::new(&ctx, -2.0, true, false)));
        button.tap().unwrap();
        assert_eq!(mock.calls(), vec![OutputCall::Scroll { amount: -2, as_clicks: true }]);
    }

    #[test]
    fn test_continuous_scroll_stops_on_release() {
        let (ctx, mock, _) = context();
        let mut button = Button::new(ButtonKind::Scroll(ScrollButton::new(&ctx, 1.0, false, true)));
        button.press().unwrap();
        thread::sleep(Duration::from_millis(60));
        button.release().unwrap();
        let count = mock.calls().len();
        assert!(count > 0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(mock.calls().len(), count);
    }
}
