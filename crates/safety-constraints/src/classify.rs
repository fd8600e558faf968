//! Category resolution for incoming actions.

use safety_types::{ActionCategory, ActionRequest, ClassificationSource};

/// Category used when neither an explicit category nor a keyword applies.
pub const DEFAULT_CATEGORY: ActionCategory = ActionCategory::ContentModification;

/// Resolve the category an action is evaluated under.
///
/// An explicit `action_category` wins; otherwise the `action_type` keywords
/// decide; otherwise [`DEFAULT_CATEGORY`].
pub fn classify(request: &ActionRequest) -> (ActionCategory, ClassificationSource) {
    if let Some(category) = request.category {
        return (category, ClassificationSource::Explicit);
    }
    match ActionCategory::from_keywords(&request.action_type) {
        Some(category) => (category, ClassificationSource::Keyword),
        None => (DEFAULT_CATEGORY, ClassificationSource::Default),
    }
}
