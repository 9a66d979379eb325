use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options passed to `observe()`, as script would write them.
///
/// Flags left as `None` were omitted by the caller; [`ObserveOptions::normalize`]
/// applies the implied defaults and rejects contradictory combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: Option<bool>,
    pub character_data: Option<bool>,
    pub subtree: bool,
    pub attribute_old_value: Option<bool>,
    pub character_data_old_value: Option<bool>,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    pub fn attributes() -> Self {
        Self {
            attributes: Some(true),
            ..Self::default()
        }
    }

    pub fn character_data() -> Self {
        Self {
            character_data: Some(true),
            ..Self::default()
        }
    }

    pub fn with_subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn with_attribute_old_value(mut self) -> Self {
        self.attribute_old_value = Some(true);
        self
    }

    pub fn with_character_data_old_value(mut self) -> Self {
        self.character_data_old_value = Some(true);
        self
    }

    pub fn with_attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("the options must request at least one of 'childList', 'attributes', or 'characterData'")]
    NothingObserved,
    #[error("'attributeOldValue' requires 'attributes' to be true")]
    AttributeOldValueWithoutAttributes,
    #[error("'attributeFilter' requires 'attributes' to be true")]
    AttributeFilterWithoutAttributes,
    #[error("'characterDataOldValue' requires 'characterData' to be true")]
    CharacterDataOldValueWithoutCharacterData,
}

/// Validated options stored on a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    pub fn normalize(init: &MutationObserverInit) -> Result<Self, ConfigurationError> {
        let mut attributes = init.attributes;
        let mut character_data = init.character_data;

        if attributes.is_none()
            && (init.attribute_old_value.is_some() || init.attribute_filter.is_some())
        {
            attributes = Some(true);
        }
        if character_data.is_none() && init.character_data_old_value.is_some() {
            character_data = Some(true);
        }

        let attributes = attributes.unwrap_or(false);
        let character_data = character_data.unwrap_or(false);
        let attribute_old_value = init.attribute_old_value.unwrap_or(false);
        let character_data_old_value = init.character_data_old_value.unwrap_or(false);

        if !init.child_list && !attributes && !character_data {
            return Err(ConfigurationError::NothingObserved);
        }
        if attribute_old_value && !attributes {
            return Err(ConfigurationError::AttributeOldValueWithoutAttributes);
        }
        if init.attribute_filter.is_some() && !attributes {
            return Err(ConfigurationError::AttributeFilterWithoutAttributes);
        }
        if character_data_old_value && !character_data {
            return Err(ConfigurationError::CharacterDataOldValueWithoutCharacterData);
        }

        Ok(Self {
            child_list: init.child_list,
            attributes,
            character_data,
            subtree: init.subtree,
            attribute_old_value,
            character_data_old_value,
            attribute_filter: init.attribute_filter.clone(),
        })
    }

    /// Whether an attribute change passes `attributeFilter`. Namespaced
    /// attributes never pass a filter.
    pub(crate) fn accepts_attribute(&self, name: &str, namespace: Option<&str>) -> bool {
        match &self.attribute_filter {
            None => true,
            Some(filter) => namespace.is_none() && filter.iter().any(|entry| entry == name),
        }
    }
}
