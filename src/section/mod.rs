//! Compiled section table: the runtime form of `config::SectionConfig`,
//! analogous to the teacher's `RouteConfig` → `CompiledRoute` split.

use crate::config::SectionConfig;
use crate::error::MockError;
use crate::routing::Pattern;
use crate::transform::TransformOp;
use indexmap::IndexMap;

pub struct CompiledSection {
    pub name: String,
    pub pattern: Pattern,
    pub strict_path: bool,
    pub return_body: bool,
    pub header_id_names: Vec<String>,
    pub body_id_paths: Vec<String>,
    pub request_transforms: Vec<TransformOp>,
    pub response_transforms: Vec<TransformOp>,
}

impl CompiledSection {
    fn compile(name: &str, cfg: &SectionConfig) -> Result<Self, MockError> {
        let pattern = Pattern::compile(&cfg.path_pattern, cfg.case_sensitive)?;
        Ok(Self {
            name: name.to_string(),
            pattern,
            strict_path: cfg.strict_path,
            return_body: cfg.return_body,
            header_id_names: cfg.header_id_names.clone(),
            body_id_paths: cfg.body_id_paths.clone(),
            request_transforms: cfg
                .transformations
                .request
                .iter()
                .map(TransformOp::compile)
                .collect(),
            response_transforms: cfg
                .transformations
                .response
                .iter()
                .map(TransformOp::compile)
                .collect(),
        })
    }
}

/// Section table preserving configuration insertion order (spec §4.1:
/// "the first matching section in a deterministic order").
pub struct SectionTable {
    sections: IndexMap<String, CompiledSection>,
}

impl SectionTable {
    pub fn compile(raw: &IndexMap<String, SectionConfig>) -> Result<Self, MockError> {
        let mut sections = IndexMap::with_capacity(raw.len());
        for (name, cfg) in raw {
            sections.insert(name.clone(), CompiledSection::compile(name, cfg)?);
        }
        Ok(Self { sections })
    }

    /// First section (in insertion order) whose pattern matches `path`.
    pub fn match_path(&self, path: &[&str]) -> Option<&CompiledSection> {
        self.sections.values().find(|s| s.pattern.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformConfig;
    use crate::routing::split_path;

    fn section_cfg(pattern: &str, strict: bool) -> SectionConfig {
        SectionConfig {
            path_pattern: pattern.to_string(),
            case_sensitive: true,
            strict_path: strict,
            return_body: false,
            header_id_names: vec![],
            body_id_paths: vec!["/id".to_string()],
            transformations: TransformConfig::default(),
        }
    }

    #[test]
    fn first_matching_section_wins_in_insertion_order() {
        let mut raw = IndexMap::new();
        raw.insert("specific".to_string(), section_cfg("/a/b", false));
        raw.insert("catchall".to_string(), section_cfg("/a/**", false));
        let table = SectionTable::compile(&raw).unwrap();
        let path = split_path("/a/b");
        let hit = table.match_path(&path).unwrap();
        assert_eq!(hit.name, "specific");
    }
}
