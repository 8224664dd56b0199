//! Configuration loader and validator
//!
//! Loads binding configuration from TOML (or JSON) files in the configs/
//! directory and builds the action maps the router works on.

use crate::mapping::actuators::button::{LongPress, ScrollButton};
use crate::mapping::actuators::cross::CrossSettings;
use crate::mapping::actuators::filters::AccelerationCurve;
use crate::mapping::actuators::gyro::GyroSettings;
use crate::mapping::actuators::macros::MacroButton;
use crate::mapping::actuators::swipe::SwipeSettings;
use crate::mapping::actuators::trackball::TrackballSettings;
use crate::mapping::actuators::{
    Actuator, ActuatorError, Button, ButtonCross, ButtonKind, Context, GyroMouse, MacroStep,
    PadGesture, PadScroll, PadSlideCross, PadSlideStick, PadStick, Radial, Side, Slide, StickAxis,
    StickScroll, Swipe, Trackball, Trackpad, TriggerAxis, TriggerButton,
};
use crate::mapping::router::ActionMap;
use crate::steamcon::types::LogicalInput;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid binding: {0}")]
    Actuator(#[from] ActuatorError),
}

/// Bindings of one action map, keyed by input name
pub type Bindings = BTreeMap<LogicalInput, BindingConfig>;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the base map
    #[serde(default = "default_map_name")]
    pub name: String,

    /// Bindings of the base map
    #[serde(default)]
    pub bindings: Bindings,

    /// Maps that layer buttons and macros can enter
    #[serde(default)]
    pub action_maps: BTreeMap<String, Bindings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_map_name(),
            bindings: Bindings::new(),
            action_maps: BTreeMap::new(),
        }
    }
}

fn default_map_name() -> String {
    "base".to_string()
}

fn default_true() -> bool {
    true
}

fn default_deadzone() -> f64 {
    0.2
}

fn default_stick_radial_deadzone() -> f64 {
    Radial::DEFAULT_DEADZONE
}

fn default_pad_radial_deadzone() -> f64 {
    Radial::PAD_DEADZONE
}

fn default_relative_size() -> f64 {
    Slide::DEFAULT_RELATIVE_SIZE
}

fn default_slide_stick_deadzone() -> f64 {
    PadSlideStick::DEFAULT_DEADZONE
}

fn default_inner_radius() -> f64 {
    0.35
}

fn default_pull_threshold() -> f64 {
    TriggerButton::DEFAULT_THRESHOLD
}

fn default_scroll_amount() -> f64 {
    1.0
}

fn default_long_press_ms() -> u64 {
    LongPress::DEFAULT_THRESHOLD.as_millis() as u64
}

fn default_repetitions() -> f64 {
    MacroButton::DEFAULT_REPETITIONS_PER_SECOND
}

fn default_stick_scroll_sensitivity() -> f64 {
    StickScroll::DEFAULT_SENSITIVITY
}

fn default_pad_scroll_sensitivity() -> f64 {
    PadScroll::DEFAULT_SENSITIVITY
}

fn default_trackball_sensitivity() -> f64 {
    TrackballSettings::default().sensitivity
}

fn default_deceleration() -> f64 {
    TrackballSettings::default().deceleration
}

fn default_acceleration() -> AccelerationConfig {
    AccelerationConfig::default()
}

fn default_minimum_distance() -> f64 {
    SwipeSettings::default().minimum_distance
}

fn default_long_swipe_threshold() -> f64 {
    SwipeSettings::default().long_swipe_threshold
}

fn default_minimum_speed() -> f64 {
    SwipeSettings::default().minimum_speed
}

fn default_gyro_sensitivity() -> f64 {
    GyroSettings::default().sensitivity
}

/// What a digital control does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ButtonConfig {
    /// Do nothing (explicit no-op)
    None,

    /// Hold a key combo such as "ctrl+c" while pressed
    Key {
        key: String,
        /// Fire on every press event, not just the first
        #[serde(default)]
        repeat: bool,
    },

    /// Enter an action map while held
    Layer {
        name: String,
        #[serde(default)]
        transparent: bool,
    },

    /// Press (or release) another button
    Toggle {
        button: Box<ButtonConfig>,
        #[serde(default = "default_true")]
        press_else_release: bool,
    },

    /// Tap another button on both press and release
    Doubler { button: Box<ButtonConfig> },

    /// Several buttons at once
    Many { buttons: Vec<ButtonConfig> },

    Scroll {
        #[serde(default = "default_scroll_amount")]
        amount: f64,
        #[serde(default = "default_true")]
        as_clicks: bool,
        /// Keep scrolling while held
        #[serde(default)]
        continuous: bool,
    },

    LongPress {
        short: Box<ButtonConfig>,
        long: Box<ButtonConfig>,
        #[serde(default = "default_long_press_ms")]
        threshold_ms: u64,
        /// Press `long` as soon as the threshold passes
        #[serde(default)]
        hold_long: bool,
    },

    Macro {
        #[serde(default)]
        pressed: Vec<MacroStep>,
        #[serde(default)]
        held: Vec<MacroStep>,
        #[serde(default)]
        released: Vec<MacroStep>,
        #[serde(default = "default_repetitions")]
        repetitions_per_second: f64,
    },

    /// First press presses, second press releases
    DualStage { button: Box<ButtonConfig> },
}

impl Default for ButtonConfig {
    fn default() -> Self {
        ButtonConfig::None
    }
}

/// Acceleration curve of the trackball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationConfig {
    pub factor: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        let curve = AccelerationCurve::default();
        Self {
            factor: curve.factor,
            lower: curve.lower,
            upper: curve.upper,
        }
    }
}

/// Analog gestures, each tied to one kind of input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureConfig {
    TriggerButton {
        button: ButtonConfig,
        #[serde(default = "default_pull_threshold")]
        pull_threshold: f64,
        #[serde(default)]
        include_switch_in_range: bool,
    },

    TriggerAxis {
        side: Side,
        #[serde(default)]
        include_switch_in_range: bool,
    },

    StickCross {
        #[serde(default)]
        east: ButtonConfig,
        #[serde(default)]
        north: ButtonConfig,
        #[serde(default)]
        west: ButtonConfig,
        #[serde(default)]
        south: ButtonConfig,
        #[serde(default)]
        inner: ButtonConfig,
        #[serde(default)]
        outer: ButtonConfig,
        #[serde(default = "default_deadzone")]
        deadzone: f64,
        #[serde(default = "default_inner_radius")]
        inner_radius: f64,
        #[serde(default)]
        outer_radius: f64,
        #[serde(default = "default_true")]
        has_overlap: bool,
    },

    StickRadial {
        buttons: Vec<ButtonConfig>,
        #[serde(default = "default_stick_radial_deadzone")]
        deadzone: f64,
        /// Start of the first slice, in units of π
        #[serde(default)]
        angle_offset: f64,
        #[serde(default = "default_true")]
        increments_left: bool,
        #[serde(default)]
        taps: bool,
    },

    StickAxis {
        side: Side,
        #[serde(default = "default_deadzone")]
        deadzone: f64,
    },

    StickScroll {
        #[serde(default = "default_stick_scroll_sensitivity")]
        sensitivity: f64,
        #[serde(default = "default_deadzone")]
        deadzone: f64,
        #[serde(default)]
        reversed: bool,
        #[serde(default)]
        along_x: bool,
    },

    PadCross {
        #[serde(default)]
        east: ButtonConfig,
        #[serde(default)]
        north: ButtonConfig,
        #[serde(default)]
        west: ButtonConfig,
        #[serde(default)]
        south: ButtonConfig,
        #[serde(default)]
        inner: ButtonConfig,
        #[serde(default)]
        outer: ButtonConfig,
        #[serde(default = "default_deadzone")]
        deadzone: f64,
        #[serde(default = "default_inner_radius")]
        inner_radius: f64,
        #[serde(default)]
        outer_radius: f64,
        #[serde(default = "default_true")]
        has_overlap: bool,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    PadRadial {
        buttons: Vec<ButtonConfig>,
        #[serde(default = "default_pad_radial_deadzone")]
        deadzone: f64,
        #[serde(default)]
        angle_offset: f64,
        #[serde(default = "default_true")]
        increments_left: bool,
        #[serde(default)]
        taps: bool,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    PadSwipe {
        buttons: Vec<ButtonConfig>,
        /// Per slice; `none` entries fall back to the short swipe
        #[serde(default)]
        long_buttons: Vec<ButtonConfig>,
        #[serde(default = "default_minimum_distance")]
        minimum_distance: f64,
        #[serde(default = "default_long_swipe_threshold")]
        long_swipe_threshold: f64,
        #[serde(default)]
        angle_offset: f64,
        #[serde(default)]
        continuous: bool,
        #[serde(default = "default_minimum_speed")]
        minimum_speed: f64,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    PadTrackball {
        #[serde(default = "default_trackball_sensitivity")]
        sensitivity: f64,
        #[serde(default = "default_true")]
        has_inertia: bool,
        #[serde(default = "default_deceleration")]
        deceleration: f64,
        #[serde(default)]
        invert_x: bool,
        #[serde(default)]
        invert_y: bool,
        #[serde(default = "default_acceleration")]
        acceleration: AccelerationConfig,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    PadStick {
        side: Side,
        #[serde(default = "default_deadzone")]
        deadzone: f64,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    PadScroll {
        /// Circle the finger when true, swipe otherwise
        #[serde(default = "default_true")]
        wheel: bool,
        #[serde(default = "default_pad_scroll_sensitivity")]
        sensitivity: f64,
        #[serde(default)]
        reversed: bool,
        #[serde(default = "default_true")]
        along_x: bool,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    /// Cross driven by sliding a virtual stick across the pad
    PadSlideCross {
        #[serde(default)]
        east: ButtonConfig,
        #[serde(default)]
        north: ButtonConfig,
        #[serde(default)]
        west: ButtonConfig,
        #[serde(default)]
        south: ButtonConfig,
        #[serde(default)]
        inner: ButtonConfig,
        #[serde(default)]
        outer: ButtonConfig,
        #[serde(default = "default_deadzone")]
        deadzone: f64,
        #[serde(default = "default_inner_radius")]
        inner_radius: f64,
        #[serde(default)]
        outer_radius: f64,
        #[serde(default = "default_true")]
        has_overlap: bool,
        /// Share of the pad radius that makes a full push
        #[serde(default = "default_relative_size")]
        relative_size: f64,
        #[serde(default)]
        anchored: bool,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    PadSlideStick {
        side: Side,
        #[serde(default = "default_relative_size")]
        relative_size: f64,
        #[serde(default = "default_slide_stick_deadzone")]
        deadzone: f64,
        #[serde(default)]
        anchored: bool,
        #[serde(default)]
        double_tap: ButtonConfig,
        #[serde(default)]
        double_tap_held: bool,
    },

    GyroMouse {
        #[serde(default = "default_gyro_sensitivity")]
        sensitivity: f64,
        #[serde(default = "default_true")]
        yaw_else_roll: bool,
        #[serde(default)]
        invert_x: bool,
        #[serde(default)]
        invert_y: bool,
    },
}

/// One binding: either a button or an analog gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingConfig {
    Button(ButtonConfig),
    Gesture(GestureConfig),
}

impl ButtonConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, ButtonConfig::None)
    }

    /// Buttons nested directly inside this one
    fn children(&self) -> Vec<&ButtonConfig> {
        match self {
            ButtonConfig::Toggle { button, .. }
            | ButtonConfig::Doubler { button }
            | ButtonConfig::DualStage { button } => vec![button.as_ref()],
            ButtonConfig::Many { buttons } => buttons.iter().collect(),
            ButtonConfig::LongPress { short, long, .. } => vec![short.as_ref(), long.as_ref()],
            _ => Vec::new(),
        }
    }

    pub fn build(&self, ctx: &Context) -> Result<Button, ActuatorError> {
        let button = match self {
            ButtonConfig::None => Button::none(),
            ButtonConfig::Key { key, repeat } => {
                let button = Button::key(ctx, key);
                if *repeat {
                    button.with_repetition()
                } else {
                    button
                }
            }
            ButtonConfig::Layer { name, transparent } => Button::layer(ctx, name, *transparent),
            ButtonConfig::Toggle {
                button,
                press_else_release,
            } => Button::new(ButtonKind::Toggle {
                target: Box::new(button.build(ctx)?),
                press_else_release: *press_else_release,
            }),
            ButtonConfig::Doubler { button } => {
                Button::new(ButtonKind::Doubler(Box::new(button.build(ctx)?)))
            }
            ButtonConfig::Many { buttons } => Button::new(ButtonKind::Many(
                buttons
                    .iter()
                    .map(|b| b.build(ctx))
                    .collect::<Result<_, _>>()?,
            )),
            ButtonConfig::Scroll {
                amount,
                as_clicks,
                continuous,
            } => Button::new(ButtonKind::Scroll(ScrollButton::new(
                ctx,
                *amount,
                *as_clicks,
                *continuous,
            ))),
            ButtonConfig::LongPress {
                short,
                long,
                threshold_ms,
                hold_long,
            } => Button::new(ButtonKind::LongPress(LongPress::new(
                short.build(ctx)?,
                long.build(ctx)?,
                Duration::from_millis(*threshold_ms),
                *hold_long,
            )?)),
            ButtonConfig::Macro {
                pressed,
                held,
                released,
                repetitions_per_second,
            } => Button::new(ButtonKind::Macro(MacroButton::new(
                ctx,
                pressed.clone(),
                held.clone(),
                released.clone(),
                *repetitions_per_second,
            )?)),
            ButtonConfig::DualStage { button } => button.build(ctx)?.with_dual_stage(),
        };
        Ok(button)
    }

    fn build_optional(&self, ctx: &Context) -> Result<Option<Button>, ActuatorError> {
        if self.is_none() {
            Ok(None)
        } else {
            self.build(ctx).map(Some)
        }
    }
}

fn build_buttons(configs: &[ButtonConfig], ctx: &Context) -> Result<Vec<Button>, ActuatorError> {
    configs.iter().map(|c| c.build(ctx)).collect()
}

fn build_cross(
    ctx: &Context,
    [east, north, west, south]: [&ButtonConfig; 4],
    inner: &ButtonConfig,
    outer: &ButtonConfig,
    settings: CrossSettings,
) -> Result<ButtonCross, ActuatorError> {
    let mut cross = ButtonCross::new(
        east.build(ctx)?,
        north.build(ctx)?,
        west.build(ctx)?,
        south.build(ctx)?,
        settings,
    )?;
    if let Some(button) = inner.build_optional(ctx)? {
        cross = cross.with_inner(button);
    }
    if let Some(button) = outer.build_optional(ctx)? {
        cross = cross.with_outer(button);
    }
    Ok(cross)
}

fn build_pad(
    ctx: &Context,
    gesture: PadGesture,
    double_tap: &ButtonConfig,
    held: bool,
) -> Result<Actuator, ActuatorError> {
    let mut pad = Trackpad::new(gesture);
    if let Some(button) = double_tap.build_optional(ctx)? {
        pad = pad.with_double_tap(button, held);
    }
    Ok(Actuator::Pad(pad))
}

impl GestureConfig {
    /// Whether this gesture can be bound to `input`
    pub fn accepts(&self, input: LogicalInput) -> bool {
        match self {
            GestureConfig::TriggerButton { .. } | GestureConfig::TriggerAxis { .. } => matches!(
                input,
                LogicalInput::LeftTrigger | LogicalInput::RightTrigger
            ),
            GestureConfig::StickCross { .. }
            | GestureConfig::StickRadial { .. }
            | GestureConfig::StickAxis { .. }
            | GestureConfig::StickScroll { .. } => input == LogicalInput::Stick,
            GestureConfig::GyroMouse { .. } => input == LogicalInput::Motion,
            _ => input.is_trackpad(),
        }
    }

    /// Buttons nested directly inside this gesture
    fn buttons(&self) -> Vec<&ButtonConfig> {
        match self {
            GestureConfig::TriggerButton { button, .. } => vec![button],
            GestureConfig::StickCross {
                east,
                north,
                west,
                south,
                inner,
                outer,
                ..
            } => vec![east, north, west, south, inner, outer],
            GestureConfig::PadCross {
                east,
                north,
                west,
                south,
                inner,
                outer,
                double_tap,
                ..
            }
            | GestureConfig::PadSlideCross {
                east,
                north,
                west,
                south,
                inner,
                outer,
                double_tap,
                ..
            } => vec![east, north, west, south, inner, outer, double_tap],
            GestureConfig::StickRadial { buttons, .. } => buttons.iter().collect(),
            GestureConfig::PadRadial {
                buttons,
                double_tap,
                ..
            } => buttons.iter().chain(std::iter::once(double_tap)).collect(),
            GestureConfig::PadSwipe {
                buttons,
                long_buttons,
                double_tap,
                ..
            } => buttons
                .iter()
                .chain(long_buttons)
                .chain(std::iter::once(double_tap))
                .collect(),
            GestureConfig::PadTrackball { double_tap, .. }
            | GestureConfig::PadStick { double_tap, .. }
            | GestureConfig::PadScroll { double_tap, .. }
            | GestureConfig::PadSlideStick { double_tap, .. } => vec![double_tap],
            GestureConfig::TriggerAxis { .. }
            | GestureConfig::StickAxis { .. }
            | GestureConfig::StickScroll { .. }
            | GestureConfig::GyroMouse { .. } => Vec::new(),
        }
    }

    pub fn build(&self, ctx: &Context) -> Result<Actuator, ActuatorError> {
        let actuator = match self {
            GestureConfig::TriggerButton {
                button,
                pull_threshold,
                include_switch_in_range,
            } => Actuator::TriggerButton(TriggerButton::new(
                button.build(ctx)?,
                *pull_threshold,
                *include_switch_in_range,
            )?),
            GestureConfig::TriggerAxis {
                side,
                include_switch_in_range,
            } => Actuator::TriggerAxis(TriggerAxis::new(ctx, *side, *include_switch_in_range)),
            GestureConfig::StickCross {
                east,
                north,
                west,
                south,
                inner,
                outer,
                deadzone,
                inner_radius,
                outer_radius,
                has_overlap,
            } => Actuator::StickCross(build_cross(
                ctx,
                [east, north, west, south],
                inner,
                outer,
                CrossSettings {
                    deadzone: *deadzone,
                    inner_radius: *inner_radius,
                    outer_radius: *outer_radius,
                    has_overlap: *has_overlap,
                    ..CrossSettings::default()
                },
            )?),
            GestureConfig::StickRadial {
                buttons,
                deadzone,
                angle_offset,
                increments_left,
                taps,
            } => Actuator::StickRadial(Radial::new(
                build_buttons(buttons, ctx)?,
                *deadzone,
                *angle_offset,
                *increments_left,
                *taps,
            )?),
            GestureConfig::StickAxis { side, deadzone } => {
                Actuator::StickAxis(StickAxis::new(ctx, *side, *deadzone)?)
            }
            GestureConfig::StickScroll {
                sensitivity,
                deadzone,
                reversed,
                along_x,
            } => Actuator::StickScroll(StickScroll::new(
                ctx,
                *sensitivity,
                *deadzone,
                *reversed,
                *along_x,
            )?),
            GestureConfig::PadCross {
                east,
                north,
                west,
                south,
                inner,
                outer,
                deadzone,
                inner_radius,
                outer_radius,
                has_overlap,
                double_tap,
                double_tap_held,
            } => {
                let cross = build_cross(
                    ctx,
                    [east, north, west, south],
                    inner,
                    outer,
                    CrossSettings {
                        deadzone: *deadzone,
                        inner_radius: *inner_radius,
                        outer_radius: *outer_radius,
                        has_overlap: *has_overlap,
                        ..CrossSettings::pad()
                    },
                )?;
                build_pad(ctx, PadGesture::Cross(cross), double_tap, *double_tap_held)?
            }
            GestureConfig::PadRadial {
                buttons,
                deadzone,
                angle_offset,
                increments_left,
                taps,
                double_tap,
                double_tap_held,
            } => {
                let radial = Radial::new(
                    build_buttons(buttons, ctx)?,
                    *deadzone,
                    *angle_offset,
                    *increments_left,
                    *taps,
                )?;
                build_pad(ctx, PadGesture::Radial(radial), double_tap, *double_tap_held)?
            }
            GestureConfig::PadSwipe {
                buttons,
                long_buttons,
                minimum_distance,
                long_swipe_threshold,
                angle_offset,
                continuous,
                minimum_speed,
                double_tap,
                double_tap_held,
            } => {
                let long_buttons = long_buttons
                    .iter()
                    .map(|b| b.build_optional(ctx))
                    .collect::<Result<_, _>>()?;
                let swipe = Swipe::new(
                    build_buttons(buttons, ctx)?,
                    long_buttons,
                    SwipeSettings {
                        minimum_distance: *minimum_distance,
                        long_swipe_threshold: *long_swipe_threshold,
                        angle_offset: *angle_offset,
                        continuous: *continuous,
                        minimum_speed: *minimum_speed,
                    },
                )?;
                build_pad(ctx, PadGesture::Swipe(swipe), double_tap, *double_tap_held)?
            }
            GestureConfig::PadTrackball {
                sensitivity,
                has_inertia,
                deceleration,
                invert_x,
                invert_y,
                acceleration,
                double_tap,
                double_tap_held,
            } => {
                let trackball = Trackball::new(
                    ctx,
                    TrackballSettings {
                        sensitivity: *sensitivity,
                        has_inertia: *has_inertia,
                        deceleration: *deceleration,
                        invert_x: *invert_x,
                        invert_y: *invert_y,
                        acceleration: AccelerationCurve {
                            factor: acceleration.factor,
                            lower: acceleration.lower,
                            upper: acceleration.upper,
                        },
                    },
                )?;
                build_pad(ctx, PadGesture::Trackball(trackball), double_tap, *double_tap_held)?
            }
            GestureConfig::PadStick {
                side,
                deadzone,
                double_tap,
                double_tap_held,
            } => {
                let stick = PadStick::new(StickAxis::new(ctx, *side, *deadzone)?);
                build_pad(ctx, PadGesture::Stick(stick), double_tap, *double_tap_held)?
            }
            GestureConfig::PadScroll {
                wheel,
                sensitivity,
                reversed,
                along_x,
                double_tap,
                double_tap_held,
            } => {
                let scroll = PadScroll::new(ctx, *wheel, *sensitivity, *reversed, *along_x)?;
                build_pad(ctx, PadGesture::Scroll(scroll), double_tap, *double_tap_held)?
            }
            GestureConfig::PadSlideCross {
                east,
                north,
                west,
                south,
                inner,
                outer,
                deadzone,
                inner_radius,
                outer_radius,
                has_overlap,
                relative_size,
                anchored,
                double_tap,
                double_tap_held,
            } => {
                let cross = build_cross(
                    ctx,
                    [east, north, west, south],
                    inner,
                    outer,
                    CrossSettings {
                        deadzone: *deadzone,
                        inner_radius: *inner_radius,
                        outer_radius: *outer_radius,
                        has_overlap: *has_overlap,
                        ..CrossSettings::default()
                    },
                )?;
                let slide = PadSlideCross::new(Slide::new(*relative_size, *anchored)?, cross);
                build_pad(ctx, PadGesture::SlideCross(slide), double_tap, *double_tap_held)?
            }
            GestureConfig::PadSlideStick {
                side,
                relative_size,
                deadzone,
                anchored,
                double_tap,
                double_tap_held,
            } => {
                let slide = Slide::new(*relative_size, *anchored)?;
                let stick = PadSlideStick::new(ctx, *side, slide, *deadzone)?;
                build_pad(ctx, PadGesture::SlideStick(stick), double_tap, *double_tap_held)?
            }
            GestureConfig::GyroMouse {
                sensitivity,
                yaw_else_roll,
                invert_x,
                invert_y,
            } => Actuator::Gyro(GyroMouse::new(
                ctx,
                GyroSettings {
                    sensitivity: *sensitivity,
                    yaw_else_roll: *yaw_else_roll,
                    invert_x: *invert_x,
                    invert_y: *invert_y,
                },
            )?),
        };
        Ok(actuator)
    }
}

impl BindingConfig {
    /// `None` for an explicitly unbound input
    pub fn build(&self, ctx: &Context) -> Result<Option<Actuator>, ActuatorError> {
        match self {
            BindingConfig::Button(ButtonConfig::None) => Ok(None),
            BindingConfig::Button(button) => Ok(Some(Actuator::Button(button.build(ctx)?))),
            BindingConfig::Gesture(gesture) => gesture.build(ctx).map(Some),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or JSON if the extension says so
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let is_json = path_ref
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        info!("✓ Config parsed successfully");
        debug!("  - Base map: '{}' ({} bindings)", config.name, config.bindings.len());
        debug!("  - Action maps: {:?}", config.action_maps.keys().collect::<Vec<_>>());

        config.validate()?;
        info!("✓ Config validation passed");

        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("Base map name must not be empty".into()));
        }
        if self.action_maps.contains_key(&self.name) {
            return Err(ConfigError::Invalid(format!(
                "Action map '{}' has the same name as the base map",
                self.name
            )));
        }

        self.validate_bindings(&self.name, &self.bindings)?;
        for (name, bindings) in &self.action_maps {
            self.validate_bindings(name, bindings)?;
        }
        Ok(())
    }

    fn validate_bindings(&self, map: &str, bindings: &Bindings) -> Result<(), ConfigError> {
        for (input, binding) in bindings {
            let context = format!("map '{}' input {:?}", map, input);
            match binding {
                BindingConfig::Button(button) => {
                    if !button.is_none() && input.is_continuous() {
                        return Err(ConfigError::Invalid(format!(
                            "{}: button bindings need a digital input",
                            context
                        )));
                    }
                    self.validate_button(button, &context)?;
                }
                BindingConfig::Gesture(gesture) => {
                    if !gesture.accepts(*input) {
                        return Err(ConfigError::Invalid(format!(
                            "{}: gesture cannot be bound to this input",
                            context
                        )));
                    }
                    for button in gesture.buttons() {
                        self.validate_button(button, &context)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Validate key names and layer references of a button tree
    fn validate_button(&self, button: &ButtonConfig, context: &str) -> Result<(), ConfigError> {
        match button {
            ButtonConfig::Key { key, .. } => self.validate_key(key, context)?,
            ButtonConfig::Layer { name, .. } => self.validate_layer(name, context)?,
            ButtonConfig::Macro {
                pressed,
                held,
                released,
                ..
            } => {
                for step in pressed.iter().chain(held).chain(released) {
                    step.validate()
                        .map_err(|e| ConfigError::Invalid(format!("{}: {}", context, e)))?;
                    if let MacroStep::EnterLayer { name, .. } | MacroStep::ExitLayer { name } = step
                    {
                        self.validate_layer(name, context)?;
                    }
                }
            }
            _ => {}
        }
        for child in button.children() {
            self.validate_button(child, context)?;
        }
        Ok(())
    }

    /// Every part of a combo like "shift+w" must be non-empty
    fn validate_key(&self, key: &str, context: &str) -> Result<(), ConfigError> {
        if key.trim().is_empty() || key.split('+').any(|part| part.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "Empty key in {}; use {{ type = \"none\" }} for an explicit no-op",
                context
            )));
        }
        Ok(())
    }

    fn validate_layer(&self, name: &str, context: &str) -> Result<(), ConfigError> {
        if !self.action_maps.contains_key(name) {
            return Err(ConfigError::Invalid(format!(
                "{} references unknown action map '{}'",
                context, name
            )));
        }
        Ok(())
    }

    /// Build the base map and the pool of layer maps
    pub fn build_maps(&self, ctx: &Context) -> Result<(ActionMap, Vec<ActionMap>), ConfigError> {
        let base = Self::build_map(&self.name, &self.bindings, ctx)?;
        let pool = self
            .action_maps
            .iter()
            .map(|(name, bindings)| Self::build_map(name, bindings, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((base, pool))
    }

    fn build_map(name: &str, bindings: &Bindings, ctx: &Context) -> Result<ActionMap, ConfigError> {
        let mut map = ActionMap::new(name);
        for (input, binding) in bindings {
            match binding.build(ctx)? {
                Some(actuator) => {
                    debug!("Map '{}': {:?} -> {}", name, input, actuator.name());
                    map.bind(*input, actuator);
                }
                None => map.unbind(*input),
            }
        }
        Ok(map)
    }
}
