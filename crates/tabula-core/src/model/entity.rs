use crate::model::field::PropertyModel;

///
/// TypeSchema
/// Declared shape of one record type: its name and ordered property list.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeSchema {
    /// Stable type name; also the native table name.
    pub name: String,
    /// Ordered property list.
    pub properties: Vec<PropertyModel>,
}

impl TypeSchema {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, property: PropertyModel) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }
}
