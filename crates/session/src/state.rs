//! Session data and the pure rules deciding what a submission will do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vmodel_core::assets::AssetBag;
use vmodel_core::error::CoreError;
use vmodel_core::history::{History, HistoryItem};
use vmodel_core::image_asset::ImageAsset;
use vmodel_core::types::ItemId;

/// Validation message for a new-model submission without a prompt.
pub const MSG_PROMPT_REQUIRED: &str = "Describe the model, pose and style to generate.";

/// Validation message for an edit with neither prompt text nor references.
pub const MSG_EDIT_INPUT_REQUIRED: &str =
    "Describe the change or add a reference image to edit.";

/// Validation message for a generation without reference assets.
pub const MSG_ASSETS_REQUIRED: &str = "Please upload at least one asset to generate a model.";

/// Validation message for an edit without a selected image.
pub const MSG_NO_CURRENT_IMAGE: &str = "No image selected for editing.";

/// Whether the session is creating a model or editing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    NewModel,
    Editing,
}

/// Which of the session's two asset bags an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BagKind {
    /// Inputs for creating a new model.
    Generation,
    /// Per-edit reference images.
    Edit,
}

impl BagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BagKind::Generation => "generation",
            BagKind::Edit => "edit",
        }
    }
}

impl fmt::Display for BagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BagKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generation" => Ok(BagKind::Generation),
            "edit" => Ok(BagKind::Edit),
            other => Err(CoreError::Validation(format!(
                "Invalid asset bag '{other}'. Must be one of: generation, edit"
            ))),
        }
    }
}

/// The backend call a submission will make, with inputs captured at
/// submission time.
#[derive(Debug, Clone)]
pub enum SubmissionPlan {
    Generate {
        assets: AssetBag,
        prompt: String,
    },
    Edit {
        /// History index of `base`; the result branches from here.
        base_index: usize,
        base: ImageAsset,
        prompt: String,
        references: AssetBag,
    },
}

/// Everything the user has built up in the current session.
///
/// In-flight tracking and the visible error live in the controller.
#[derive(Debug, Clone)]
pub struct Session {
    pub mode: Mode,
    pub history: History,
    pub generation_assets: AssetBag,
    pub edit_assets: AssetBag,
    pub prompt: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: Mode::NewModel,
            history: History::new(),
            generation_assets: AssetBag::new(),
            edit_assets: AssetBag::new(),
            prompt: String::new(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bag_mut(&mut self, kind: BagKind) -> &mut AssetBag {
        match kind {
            BagKind::Generation => &mut self.generation_assets,
            BagKind::Edit => &mut self.edit_assets,
        }
    }

    /// Back to an empty new-model session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validate the draft and capture the inputs of the next backend call.
    ///
    /// Returns the user-facing validation message on rejection.
    pub fn plan_submission(&self) -> Result<SubmissionPlan, &'static str> {
        let prompt_blank = self.prompt.trim().is_empty();

        match self.mode {
            Mode::NewModel => {
                if prompt_blank {
                    return Err(MSG_PROMPT_REQUIRED);
                }
                if self.generation_assets.is_empty() {
                    return Err(MSG_ASSETS_REQUIRED);
                }
                Ok(SubmissionPlan::Generate {
                    assets: self.generation_assets.clone(),
                    prompt: self.prompt.clone(),
                })
            }
            Mode::Editing => {
                if prompt_blank && self.edit_assets.is_empty() {
                    return Err(MSG_EDIT_INPUT_REQUIRED);
                }
                let (Some(base_index), Some(current)) =
                    (self.history.cursor(), self.history.current())
                else {
                    return Err(MSG_NO_CURRENT_IMAGE);
                };
                Ok(SubmissionPlan::Edit {
                    base_index,
                    base: current.image.clone(),
                    prompt: self.prompt.clone(),
                    references: self.edit_assets.clone(),
                })
            }
        }
    }

    /// Record a successful backend result and clear the draft.
    ///
    /// Returns the id of the new history item.
    pub fn apply_result(&mut self, plan: SubmissionPlan, image: ImageAsset) -> ItemId {
        let item = match plan {
            SubmissionPlan::Generate { prompt, .. } => {
                let item = HistoryItem::new(image, prompt);
                self.history.replace_all(item.clone());
                self.mode = Mode::Editing;
                item
            }
            SubmissionPlan::Edit {
                base_index, prompt, ..
            } => {
                let label = if prompt.trim().is_empty() {
                    vmodel_core::history::IMAGE_EDIT_LABEL.to_string()
                } else {
                    prompt
                };
                let item = HistoryItem::new(image, label);
                if let Err(e) = self.history.move_to(base_index) {
                    tracing::warn!(base_index, error = %e, "Edit base no longer in history");
                }
                self.history.append_after_cursor(item.clone());
                item
            }
        };

        self.prompt.clear();
        self.edit_assets.clear();
        item.id
    }

    /// Start editing from an uploaded image.
    pub fn apply_upload(&mut self, image: ImageAsset) -> ItemId {
        let item = HistoryItem::new(image, vmodel_core::history::UPLOAD_LABEL);
        let id = item.id;
        self.history.replace_all(item);
        self.mode = Mode::Editing;
        id
    }
}

/// Read-only view of a session for observers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub items: Vec<HistoryItem>,
    pub cursor: Option<usize>,
    pub current_id: Option<ItemId>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub generation_assets: AssetBag,
    pub edit_assets: AssetBag,
    pub prompt: String,
    pub in_flight: bool,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn capture(session: &Session, in_flight: bool, last_error: Option<String>) -> Self {
        Self {
            mode: session.mode,
            items: session.history.items().to_vec(),
            cursor: session.history.cursor(),
            current_id: session.history.current().map(|item| item.id),
            can_undo: session.history.can_undo(),
            can_redo: session.history.can_redo(),
            generation_assets: session.generation_assets.clone(),
            edit_assets: session.edit_assets.clone(),
            prompt: session.prompt.clone(),
            in_flight,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use vmodel_core::assets::AssetKey;

    use super::*;

    fn asset(payload: &str) -> ImageAsset {
        ImageAsset::from_base64("image/png", payload).unwrap()
    }

    fn editing_session(len: usize) -> Session {
        let mut session = Session::new();
        session.apply_upload(asset("STA="));
        for i in 1..len {
            session
                .history
                .append_after_cursor(HistoryItem::new(asset("SVg="), format!("i{i}")));
        }
        session
    }

    #[test]
    fn new_model_requires_prompt() {
        let mut session = Session::new();
        session.generation_assets.set(AssetKey::Face, asset("QQ=="));
        session.prompt = "   ".into();
        assert_eq!(session.plan_submission().unwrap_err(), MSG_PROMPT_REQUIRED);
    }

    #[test]
    fn new_model_requires_assets_even_with_prompt() {
        let mut session = Session::new();
        session.prompt = "studio photo".into();
        assert_eq!(session.plan_submission().unwrap_err(), MSG_ASSETS_REQUIRED);
    }

    #[test]
    fn new_model_plan_captures_inputs() {
        let mut session = Session::new();
        session.generation_assets.set(AssetKey::Face, asset("QQ=="));
        session.prompt = "studio photo".into();

        assert_matches!(
            session.plan_submission(),
            Ok(SubmissionPlan::Generate { ref assets, ref prompt })
                if assets.contains(AssetKey::Face) && prompt == "studio photo"
        );
    }

    #[test]
    fn edit_requires_prompt_or_reference() {
        let session = editing_session(1);
        assert_eq!(
            session.plan_submission().unwrap_err(),
            MSG_EDIT_INPUT_REQUIRED
        );
    }

    #[test]
    fn edit_with_reference_only_is_allowed() {
        let mut session = editing_session(1);
        session.edit_assets.set(AssetKey::Outfit, asset("Qg=="));
        assert_matches!(
            session.plan_submission(),
            Ok(SubmissionPlan::Edit { base_index: 0, .. })
        );
    }

    #[test]
    fn edit_without_current_image_is_rejected() {
        let mut session = Session::new();
        session.mode = Mode::Editing;
        session.prompt = "add hat".into();
        assert_eq!(session.plan_submission().unwrap_err(), MSG_NO_CURRENT_IMAGE);
    }

    #[test]
    fn generation_result_replaces_history_and_enters_editing() {
        let mut session = Session::new();
        session.generation_assets.set(AssetKey::Face, asset("QQ=="));
        session.prompt = "studio photo".into();
        let plan = session.plan_submission().unwrap();

        session.apply_result(plan, asset("Rw=="));

        assert_eq!(session.mode, Mode::Editing);
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history.cursor(), Some(0));
        let current = session.history.current().unwrap();
        assert_eq!(current.label, "studio photo");
        assert_eq!(current.image, asset("Rw=="));
        assert!(session.prompt.is_empty());
    }

    #[test]
    fn blank_edit_gets_fallback_label_and_clears_draft() {
        let mut session = editing_session(1);
        session.edit_assets.set(AssetKey::Background, asset("Qg=="));
        let plan = session.plan_submission().unwrap();

        session.apply_result(plan, asset("RTE="));

        assert_eq!(
            session.history.current().unwrap().label,
            vmodel_core::history::IMAGE_EDIT_LABEL
        );
        assert!(session.edit_assets.is_empty());
    }

    #[test]
    fn edit_result_branches_from_submission_cursor() {
        let mut session = editing_session(3);
        session.history.move_to(1).unwrap();
        session.prompt = "add hat".into();
        let plan = session.plan_submission().unwrap();

        // Navigation while the call is pending.
        session.history.move_to(2).unwrap();
        session.apply_result(plan, asset("RTE="));

        let labels: Vec<_> = session.history.items().iter().map(|i| &i.label[..]).collect();
        assert_eq!(labels, vec!["Initial image", "i1", "add hat"]);
        assert_eq!(session.history.cursor(), Some(2));
    }

    #[test]
    fn reset_discards_everything() {
        let mut session = editing_session(2);
        session.edit_assets.set(AssetKey::Face, asset("QQ=="));
        session.generation_assets.set(AssetKey::Face, asset("QQ=="));
        session.prompt = "draft".into();

        session.reset();

        assert_eq!(session.mode, Mode::NewModel);
        assert!(session.history.is_empty());
        assert!(session.edit_assets.is_empty());
        assert!(session.generation_assets.is_empty());
        assert!(session.prompt.is_empty());
    }

    #[test]
    fn bag_kind_parses() {
        assert_eq!("edit".parse::<BagKind>().unwrap(), BagKind::Edit);
        assert!("other".parse::<BagKind>().is_err());
    }

    #[test]
    fn snapshot_reflects_history() {
        let session = editing_session(2);
        let snapshot = SessionSnapshot::capture(&session, true, Some("oops".into()));
        assert_eq!(snapshot.mode, Mode::Editing);
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.cursor, Some(1));
        assert_eq!(snapshot.current_id, Some(session.history.items()[1].id));
        assert!(snapshot.can_undo);
        assert!(!snapshot.can_redo);
        assert!(snapshot.in_flight);
        assert_eq!(snapshot.last_error.as_deref(), Some("oops"));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["mode"], "EDITING");
    }
}
