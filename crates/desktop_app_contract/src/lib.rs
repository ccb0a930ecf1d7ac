//! Shared contract types between the desktop sync runtime and simulated applications.
//!
//! Every open program carries a type-erased props bag replicated to all clients. Applications
//! never read the bag directly: each one narrows its own slice through [`AppPropsSlice`], which
//! tolerates absent and malformed keys (a first launch has none), and writes back through
//! [`ProgramServices::update_props`], which the runtime shallow-merges into the shared bag.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use leptos::{Callable, Callback, Signal, SignalWithUntracked};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type-erased per-instance props bag.
pub type PropsBag = Map<String, Value>;

/// Props key holding the cross-client correlation id of an instance.
pub const GLOBAL_ID_KEY: &str = "globalId";
/// Props key marking a bag that must survive the reset-on-close policy.
pub const PERSIST_PROPS_KEY: &str = "persistProps";

/// Reads one key from a props bag, treating absent or malformed values as `None`.
pub fn prop<T: DeserializeOwned>(props: &PropsBag, key: &str) -> Option<T> {
    props
        .get(key)
        .filter(|value| !value.is_null())
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Serializes a slice into a props patch. Non-object serializations yield an empty patch.
pub fn to_props_patch<T: Serialize>(value: &T) -> PropsBag {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect(),
        _ => PropsBag::new(),
    }
}

/// Typed, validated view of the props keys owned by one application type.
pub trait AppPropsSlice: Sized {
    /// Program type this slice belongs to.
    const PROGRAM_TYPE: &'static str;

    /// Narrows the shared bag into this slice, defaulting every absent or malformed key.
    fn from_props(props: &PropsBag) -> Self;

    /// Produces the patch that writes this slice back into the shared bag.
    fn to_patch(&self) -> PropsBag;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Notepad document state.
pub struct NotepadProps {
    /// Document text.
    pub content: String,
    /// Display file name.
    pub file_name: String,
}

impl Default for NotepadProps {
    fn default() -> Self {
        Self {
            content: String::new(),
            file_name: "Untitled".to_string(),
        }
    }
}

impl AppPropsSlice for NotepadProps {
    const PROGRAM_TYPE: &'static str = "notepad";

    fn from_props(props: &PropsBag) -> Self {
        let defaults = Self::default();
        Self {
            content: prop(props, "content").unwrap_or(defaults.content),
            file_name: prop(props, "fileName").unwrap_or(defaults.file_name),
        }
    }

    fn to_patch(&self) -> PropsBag {
        to_props_patch(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
/// Paint drawing tools.
pub enum PaintTool {
    /// Thin freehand line.
    #[default]
    Pencil,
    /// Wide freehand stroke.
    Brush,
    /// Paints with the canvas background.
    Eraser,
    /// Straight line.
    Line,
    /// Rectangle outline.
    Rectangle,
    /// Ellipse outline.
    Ellipse,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Canvas point.
pub struct CanvasPoint {
    /// Horizontal canvas coordinate.
    pub x: f64,
    /// Vertical canvas coordinate.
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Kind of replayable paint action.
pub enum DrawActionKind {
    /// A stroke through `points`.
    Draw,
    /// Clears the whole canvas.
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of the replicated paint action log.
pub struct DrawAction {
    /// Action kind.
    #[serde(rename = "type")]
    pub kind: DrawActionKind,
    /// Stroke points; empty for `clear`.
    #[serde(default)]
    pub points: Vec<CanvasPoint>,
    /// Stroke color.
    #[serde(default)]
    pub color: String,
    /// Stroke width in pixels.
    #[serde(default)]
    pub line_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Paint canvas state, replayed from the action log on every client.
pub struct PaintProps {
    /// Selected color.
    pub current_color: String,
    /// Selected stroke width.
    pub line_width: f64,
    /// Selected tool.
    pub current_tool: PaintTool,
    /// Replayable draw log.
    pub draw_history: Vec<DrawAction>,
}

impl Default for PaintProps {
    fn default() -> Self {
        Self {
            current_color: "#000000".to_string(),
            line_width: 2.0,
            current_tool: PaintTool::Pencil,
            draw_history: Vec::new(),
        }
    }
}

impl PaintProps {
    /// Appends a stroke to the log.
    pub fn push_stroke(&mut self, points: Vec<CanvasPoint>) {
        self.draw_history.push(DrawAction {
            kind: DrawActionKind::Draw,
            points,
            color: self.current_color.clone(),
            line_width: self.line_width,
        });
    }

    /// Appends a canvas clear to the log.
    pub fn push_clear(&mut self) {
        self.draw_history.push(DrawAction {
            kind: DrawActionKind::Clear,
            points: Vec::new(),
            color: String::new(),
            line_width: 0.0,
        });
    }
}

impl AppPropsSlice for PaintProps {
    const PROGRAM_TYPE: &'static str = "paint";

    fn from_props(props: &PropsBag) -> Self {
        let defaults = Self::default();
        let draw_history = props
            .get("drawHistory")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            current_color: prop(props, "currentColor").unwrap_or(defaults.current_color),
            line_width: prop(props, "lineWidth").unwrap_or(defaults.line_width),
            current_tool: prop(props, "currentTool").unwrap_or(defaults.current_tool),
            draw_history,
        }
    }

    fn to_patch(&self) -> PropsBag {
        to_props_patch(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
/// Wallpaper placement on the desktop background.
pub enum WallpaperPosition {
    /// Render once, centered, over the background color.
    #[default]
    Center,
    /// Repeat from the top-left corner.
    Tile,
    /// Stretch to the viewport.
    Stretch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
/// Display Properties dialog selections. Absent values fall back to the live desktop settings.
pub struct DisplayPropertiesProps {
    /// Wallpaper chosen in the dialog (empty string for none).
    pub selected_wallpaper: Option<String>,
    /// Background color chosen in the dialog.
    pub selected_background_color: Option<String>,
    /// Theme name chosen in the dialog.
    pub selected_theme: Option<String>,
    /// Wallpaper placement chosen in the dialog.
    pub wallpaper_position: Option<WallpaperPosition>,
}

impl AppPropsSlice for DisplayPropertiesProps {
    const PROGRAM_TYPE: &'static str = "display-properties";

    fn from_props(props: &PropsBag) -> Self {
        Self {
            selected_wallpaper: prop(props, "selectedWallpaper"),
            selected_background_color: prop(props, "selectedBackgroundColor"),
            selected_theme: prop(props, "selectedTheme"),
            wallpaper_position: prop(props, "wallpaperPosition"),
        }
    }

    fn to_patch(&self) -> PropsBag {
        to_props_patch(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
/// Explorer window launch target.
pub struct ExplorerProps {
    /// Desktop icon the window was opened from (`my-computer`, `my-documents`, ...).
    pub icon_id: Option<String>,
}

impl AppPropsSlice for ExplorerProps {
    const PROGRAM_TYPE: &'static str = "explorer";

    fn from_props(props: &PropsBag) -> Self {
        Self {
            icon_id: prop(props, "iconId"),
        }
    }

    fn to_patch(&self) -> PropsBag {
        to_props_patch(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// System error dialog contents.
pub struct ErrorDialogProps {
    /// Message shown to the user.
    pub message: String,
    /// Error dialogs keep their props when other windows close.
    pub persist_props: bool,
}

impl Default for ErrorDialogProps {
    fn default() -> Self {
        Self {
            message: "An unknown error has occurred.".to_string(),
            persist_props: true,
        }
    }
}

impl AppPropsSlice for ErrorDialogProps {
    const PROGRAM_TYPE: &'static str = "error-dialog";

    fn from_props(props: &PropsBag) -> Self {
        let defaults = Self::default();
        Self {
            message: prop(props, "message").unwrap_or(defaults.message),
            persist_props: prop(props, PERSIST_PROPS_KEY).unwrap_or(defaults.persist_props),
        }
    }

    fn to_patch(&self) -> PropsBag {
        to_props_patch(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Commands emitted by program services to the desktop runtime.
pub enum ProgramCommand {
    /// Shallow-merge keys into this instance's props bag.
    UpdateProps {
        /// Keys to merge.
        patch: PropsBag,
    },
    /// Close this instance.
    Close {
        /// Skip the reset of other same-type instances.
        persist_props: bool,
    },
    /// Raise this instance.
    Focus,
    /// Toggle the minimized flag of this instance.
    Minimize,
    /// Set the maximized flag of this instance.
    SetMaximized {
        /// New flag value.
        maximized: bool,
    },
    /// Open another program.
    Launch {
        /// Program type to open.
        program_type: String,
        /// Initial props.
        props: PropsBag,
    },
    /// Show (or update) the shared system error dialog.
    ShowError {
        /// Message text.
        message: String,
    },
}

#[derive(Clone, Copy)]
/// Instance-scoped services handed to a simulated application.
pub struct ProgramServices {
    sender: Callback<ProgramCommand>,
}

impl ProgramServices {
    /// Creates services from the runtime command callback.
    pub fn new(sender: Callback<ProgramCommand>) -> Self {
        Self { sender }
    }

    /// Shallow-merges raw keys into the shared props bag.
    pub fn update_props(&self, patch: PropsBag) {
        if patch.is_empty() {
            return;
        }
        self.sender.call(ProgramCommand::UpdateProps { patch });
    }

    /// Writes a typed slice back into the shared props bag.
    pub fn update_slice<S: AppPropsSlice>(&self, slice: &S) {
        self.update_props(slice.to_patch());
    }

    /// Closes this instance.
    pub fn close(&self, persist_props: bool) {
        self.sender.call(ProgramCommand::Close { persist_props });
    }

    /// Raises this instance.
    pub fn focus(&self) {
        self.sender.call(ProgramCommand::Focus);
    }

    /// Opens another program.
    pub fn launch(&self, program_type: impl Into<String>, props: PropsBag) {
        self.sender.call(ProgramCommand::Launch {
            program_type: program_type.into(),
            props,
        });
    }

    /// Shows the shared system error dialog.
    pub fn show_error(&self, message: impl Into<String>) {
        self.sender.call(ProgramCommand::ShowError {
            message: message.into(),
        });
    }

    /// Low-level transport send for exceptional flows.
    pub fn send(&self, command: ProgramCommand) {
        self.sender.call(command);
    }
}

#[derive(Clone)]
/// Mount context injected by the runtime into each simulated application.
pub struct ProgramMountContext {
    /// Client-local instance id.
    pub instance_id: String,
    /// Cross-client correlation id.
    pub global_id: String,
    /// Program type tag.
    pub program_type: String,
    /// Live props bag of this instance.
    pub props: Signal<PropsBag>,
    /// Instance-scoped services.
    pub services: ProgramServices,
}

impl ProgramMountContext {
    /// Narrows the current props into a typed slice without tracking.
    pub fn slice<S: AppPropsSlice>(&self) -> S {
        self.props.with_untracked(S::from_props)
    }
}
