use crate::errors::CatalogError;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

/// A meme layout accepting a fixed number of caption lines.
///
/// Mirrors the shape of the bundled `templates.json` asset. `required_lines`
/// defaults to 2 when the asset omits the `lines` field.
#[derive(Debug, Clone, Deserialize)]
pub struct MemeTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "lines", default = "default_required_lines")]
    pub required_lines: usize,
    #[serde(default)]
    pub example: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_required_lines() -> usize {
    2
}

/// Static template catalog, loaded once at startup and never mutated.
#[derive(Debug)]
pub struct Catalog {
    templates: Vec<MemeTemplate>,
    by_id: HashMap<String, usize>,
}

const BUNDLED_TEMPLATES: &str = include_str!("../assets/templates.json");

impl Catalog {
    /// Loads the catalog bundled with the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_TEMPLATES)
    }

    /// Parses and validates a catalog from raw JSON.
    ///
    /// Rejects empty catalogs, blank ids, duplicate ids and zero line counts
    /// so the rest of the pipeline can rely on every entry being renderable.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let templates: Vec<MemeTemplate> = serde_json::from_str(raw)?;
        if templates.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(templates.len());
        for (index, template) in templates.iter().enumerate() {
            if template.id.trim().is_empty() {
                return Err(CatalogError::BlankId);
            }
            if template.required_lines == 0 {
                return Err(CatalogError::BadLineCount(template.id.clone()));
            }
            if by_id.insert(template.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(template.id.clone()));
            }
        }

        Ok(Self { templates, by_id })
    }

    pub fn get(&self, id: &str) -> Option<&MemeTemplate> {
        self.by_id.get(id).map(|&index| &self.templates[index])
    }

    /// Picks a template uniformly at random.
    ///
    /// Used as the fallback when a generation step names an unknown template
    /// id; the catalog is validated non-empty at load.
    pub fn random(&self) -> &MemeTemplate {
        let index = rand::thread_rng().gen_range(0..self.templates.len());
        &self.templates[index]
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemeTemplate> {
        self.templates.iter()
    }

    /// One line per template (id, name, line count, example captions),
    /// compact enough to embed in a model prompt.
    pub fn summary(&self) -> String {
        self.templates
            .iter()
            .map(|template| {
                let example =
                    serde_json::to_string(&template.example).unwrap_or_else(|_| "[]".to_string());
                format!(
                    "{{id: {}, name: {}, lines: {}, example: {}}}",
                    template.id, template.name, template.required_lines, example
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_loads_and_validates() {
        let catalog = Catalog::bundled().expect("bundled catalog must parse");
        assert!(!catalog.is_empty());
        assert!(catalog.get("drake").is_some());
        assert_eq!(catalog.get("drake").unwrap().required_lines, 2);
    }

    #[test]
    fn missing_lines_field_defaults_to_two() {
        let catalog = Catalog::from_json(r#"[{"id": "success", "name": "Success Kid"}]"#).unwrap();
        assert_eq!(catalog.get("success").unwrap().required_lines, 2);
        assert!(catalog.get("success").unwrap().example.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"[{"id": "a", "name": "A"}, {"id": "a", "name": "A again"}]"#;
        assert!(matches!(
            Catalog::from_json(raw),
            Err(CatalogError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(Catalog::from_json("[]"), Err(CatalogError::Empty)));
    }

    #[test]
    fn zero_line_templates_are_rejected() {
        let raw = r#"[{"id": "a", "name": "A", "lines": 0}]"#;
        assert!(matches!(
            Catalog::from_json(raw),
            Err(CatalogError::BadLineCount(id)) if id == "a"
        ));
    }

    #[test]
    fn random_always_returns_a_catalog_member() {
        let catalog = Catalog::bundled().unwrap();
        for _ in 0..50 {
            let picked = catalog.random();
            assert!(catalog.get(&picked.id).is_some());
        }
    }

    #[test]
    fn summary_mentions_every_template() {
        let catalog = Catalog::bundled().unwrap();
        let summary = catalog.summary();
        for template in catalog.iter() {
            assert!(summary.contains(&format!("id: {}", template.id)));
        }
    }
}
