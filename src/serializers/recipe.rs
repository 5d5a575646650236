use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{Category, NewRecipe, Recipe, Tag, User};
use crate::serializers::tag::TagRepresentation;
use crate::validation::FieldErrors;

pub const TITLE_MAX_CHARS: usize = 65;
pub const DESCRIPTION_MAX_CHARS: usize = 165;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";

/// API view of a recipe.
///
/// `tags` and `tag_objects` are built from the same tag rows, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRepresentation {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub public: bool,
    pub preparation: String,
    pub category: Option<String>,
    pub author: Option<i64>,
    pub tags: Vec<i64>,
    pub tag_objects: Vec<TagRepresentation>,
}

impl RecipeRepresentation {
    pub fn new(recipe: &Recipe, category: Option<&Category>, tags: Vec<Tag>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            public: recipe.is_published,
            preparation: preparation(recipe),
            category: category.map(ToString::to_string),
            author: recipe.author_id,
            tags: tags.iter().map(|t| t.id).collect(),
            tag_objects: tags.into_iter().map(TagRepresentation::from).collect(),
        }
    }

    /// Fetch the category and tags of `recipe` and build its representation.
    pub async fn load(db: &SqlitePool, recipe: &Recipe) -> Result<Self, sqlx::Error> {
        let category = match recipe.category_id {
            Some(id) => Category::find(db, id).await?,
            None => None,
        };
        let tags = Tag::for_recipe(db, recipe.id).await?;
        Ok(Self::new(recipe, category.as_ref(), tags))
    }
}

/// `"<preparation_time> <preparation_time_unit>"`, e.g. `"30 minutes"`.
pub fn preparation(recipe: &Recipe) -> String {
    format!("{} {}", recipe.preparation_time, recipe.preparation_time_unit)
}

/// Writable side of the representation. Values are kept loose so type
/// mistakes become field errors; read-only keys in the payload are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeInput {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Value>,
}

// A key that is present maps to `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Checked input. With `partial == false` every field is `Some`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRecipe {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<i64>,
    pub tags: Option<Vec<i64>>,
}

impl RecipeInput {
    /// Validate every present field, and require all of them unless `partial`.
    /// Author and tag ids must reference stored rows.
    pub async fn validate(
        self,
        db: &SqlitePool,
        partial: bool,
    ) -> Result<ValidatedRecipe, AppError> {
        let mut errors = FieldErrors::new();
        let mut out = ValidatedRecipe::default();

        let required = |field: &str, value: Option<Value>, errors: &mut FieldErrors| {
            match value {
                None if partial => None,
                None => {
                    errors.add(field, REQUIRED);
                    None
                }
                Some(Value::Null) => {
                    errors.add(field, NOT_NULL);
                    None
                }
                Some(v) => Some(v),
            }
        };

        if let Some(v) = required("title", self.title, &mut errors) {
            out.title = char_field(&mut errors, "title", v, TITLE_MAX_CHARS);
        }
        if let Some(v) = required("description", self.description, &mut errors) {
            out.description = char_field(&mut errors, "description", v, DESCRIPTION_MAX_CHARS);
        }

        if let Some(v) = required("author", self.author, &mut errors) {
            match related_pk(&v) {
                Ok(pk) => {
                    if User::find(db, pk).await?.is_some() {
                        out.author = Some(pk);
                    } else {
                        errors.add("author", does_not_exist(pk));
                    }
                }
                Err(msg) => errors.add("author", msg),
            }
        }

        if let Some(v) = required("tags", self.tags, &mut errors) {
            match v {
                Value::Array(items) => {
                    let mut ids = Vec::with_capacity(items.len());
                    for item in &items {
                        let pk = match related_pk(item) {
                            Ok(pk) => pk,
                            Err(msg) => {
                                errors.add("tags", msg);
                                break;
                            }
                        };
                        if Tag::find(db, pk).await?.is_none() {
                            errors.add("tags", does_not_exist(pk));
                            break;
                        }
                        ids.push(pk);
                    }
                    if !errors.has("tags") {
                        out.tags = Some(ids);
                    }
                }
                other => errors.add(
                    "tags",
                    format!(
                        "Expected a list of items but got type \"{}\".",
                        kind(&other)
                    ),
                ),
            }
        }

        if errors.is_empty() {
            Ok(out)
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

impl ValidatedRecipe {
    pub fn into_new_recipe(self) -> NewRecipe {
        NewRecipe {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            author_id: self.author,
            tag_ids: self.tags.unwrap_or_default(),
            ..NewRecipe::default()
        }
    }

    /// Copy present fields onto `recipe`; returns the new tag set if one was given.
    pub fn apply(self, recipe: &mut Recipe) -> Option<Vec<i64>> {
        if let Some(title) = self.title {
            recipe.title = title;
        }
        if let Some(description) = self.description {
            recipe.description = description;
        }
        if let Some(author) = self.author {
            recipe.author_id = Some(author);
        }
        self.tags
    }
}

fn char_field(errors: &mut FieldErrors, field: &str, value: Value, max: usize) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => {
            errors.add(field, "Not a valid string.");
            return None;
        }
    };

    if text.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if text.chars().count() > max {
        errors.add(field, format!("Ensure this field has no more than {max} characters."));
        return None;
    }
    Some(text)
}

fn related_pk(value: &Value) -> Result<i64, String> {
    let pk = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    pk.ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", kind(value)))
}

fn does_not_exist(pk: i64) -> String {
    format!("Invalid pk \"{pk}\" - object does not exist.")
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recipe() -> Recipe {
        Recipe {
            id: 7,
            title: "Bolo".into(),
            description: "Bolo de fubá".into(),
            slug: "bolo".into(),
            preparation_time: 30,
            preparation_time_unit: "minutes".into(),
            servings: 4,
            servings_unit: "portions".into(),
            preparation_steps: String::new(),
            preparation_steps_is_html: false,
            is_published: true,
            cover: None,
            category_id: Some(1),
            author_id: Some(3),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn tag(id: i64, name: &str) -> Tag {
        Tag {
            id,
            name: name.into(),
            slug: name.to_lowercase(),
        }
    }

    #[test]
    fn preparation_joins_time_and_unit() {
        assert_eq!(preparation(&recipe()), "30 minutes");
    }

    #[test]
    fn representation_maps_renamed_and_derived_fields() {
        let category = Category {
            id: 1,
            name: "Desserts".into(),
        };
        let rep = RecipeRepresentation::new(
            &recipe(),
            Some(&category),
            vec![tag(2, "Sweet"), tag(5, "Quick")],
        );

        let json = serde_json::to_value(&rep).unwrap();
        assert_eq!(
            json,
            json!({
                "id": 7,
                "title": "Bolo",
                "description": "Bolo de fubá",
                "public": true,
                "preparation": "30 minutes",
                "category": "Desserts",
                "author": 3,
                "tags": [2, 5],
                "tag_objects": [
                    { "id": 2, "name": "Sweet", "slug": "sweet" },
                    { "id": 5, "name": "Quick", "slug": "quick" }
                ]
            })
        );
    }

    #[test]
    fn tags_and_tag_objects_share_ids() {
        let rep = RecipeRepresentation::new(&recipe(), None, vec![tag(1, "a"), tag(9, "b")]);
        let nested: Vec<i64> = rep.tag_objects.iter().map(|t| t.id).collect();
        assert_eq!(rep.tags, nested);
        assert_eq!(rep.category, None);
    }

    #[test]
    fn char_field_rules() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            char_field(&mut errors, "title", json!("  Bolo  "), 65),
            Some("Bolo".to_string())
        );
        assert!(errors.is_empty());

        assert_eq!(char_field(&mut errors, "title", json!("   "), 65), None);
        assert_eq!(errors.get("title"), [BLANK]);

        let long = "x".repeat(66);
        assert_eq!(char_field(&mut errors, "description", json!(long), 65), None);
        assert_eq!(
            errors.get("description"),
            ["Ensure this field has no more than 65 characters."]
        );

        assert_eq!(char_field(&mut errors, "other", json!(true), 65), None);
        assert_eq!(errors.get("other"), ["Not a valid string."]);
    }

    #[test]
    fn input_distinguishes_null_from_missing() {
        let input: RecipeInput = serde_json::from_value(json!({ "author": null })).unwrap();
        assert_eq!(input.author, Some(Value::Null));
        assert_eq!(input.title, None);
    }

    #[test]
    fn related_pk_accepts_integers_and_numeric_strings() {
        assert_eq!(related_pk(&json!(4)), Ok(4));
        assert_eq!(related_pk(&json!("12")), Ok(12));
        assert_eq!(
            related_pk(&json!("abc")),
            Err("Incorrect type. Expected pk value, received str.".to_string())
        );
        assert_eq!(
            related_pk(&json!({"id": 1})),
            Err("Incorrect type. Expected pk value, received dict.".to_string())
        );
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut r = recipe();
        let tags = ValidatedRecipe {
            title: Some("Torta".into()),
            ..Default::default()
        }
        .apply(&mut r);

        assert_eq!(r.title, "Torta");
        assert_eq!(r.description, "Bolo de fubá");
        assert_eq!(r.author_id, Some(3));
        assert_eq!(tags, None);
    }
}
