use bevy::{input::touch::Touches, prelude::*, window::PrimaryWindow};
use leafwing_input_manager::prelude::*;

/// Pointer travel (logical pixels) below which a press-release counts as a click.
const CLICK_SLOP_PX: f32 = 6.0;

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    Select,
    Reload,
    ToggleGrid,
}

/// A press and release without a drag in between, at a viewport position.
#[derive(Message, Clone, Copy, Debug)]
pub struct PointerClicked {
    pub position: Vec2,
}

#[derive(Resource, Default)]
struct PointerGesture {
    start: Option<Vec2>,
    last: Vec2,
    travel: f32,
}

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let mut input_map = InputMap::<InputAction>::default();
    input_map.insert(InputAction::Select, MouseButton::Left);
    input_map.insert(InputAction::Reload, KeyCode::KeyR);
    input_map.insert(InputAction::ToggleGrid, KeyCode::KeyG);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());

    app.init_resource::<PointerGesture>();
    app.add_message::<PointerClicked>();
    app.add_systems(Update, detect_clicks);
}

/// Emits [`PointerClicked`] for mouse clicks and single-finger taps.
fn detect_clicks(
    actions: Res<ActionState<InputAction>>,
    touches: Res<Touches>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut gesture: ResMut<PointerGesture>,
    mut clicks: MessageWriter<PointerClicked>,
) {
    let pointer = window
        .cursor_position()
        .or_else(|| touches.first_pressed_position());

    let pressed = actions.just_pressed(&InputAction::Select) || touches.any_just_pressed();
    let released = actions.just_released(&InputAction::Select) || touches.any_just_released();

    if pressed && let Some(at) = pointer {
        gesture.start = Some(at);
        gesture.last = at;
        gesture.travel = 0.0;
    }

    if gesture.start.is_some()
        && let Some(at) = pointer
    {
        gesture.travel += at.distance(gesture.last);
        gesture.last = at;
    }

    if released && gesture.start.take().is_some() && gesture.travel <= CLICK_SLOP_PX {
        clicks.write(PointerClicked {
            position: pointer.unwrap_or(gesture.last),
        });
    }
}
