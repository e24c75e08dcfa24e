use std::error::Error;
use std::fs;
use std::path::Path;
use yaml_rust2::{Yaml, YamlLoader};

const INCLUDE_DIRECTIVE: &str = "!include";

/// Loads a YAML file, resolving `!include <relative path>` lines first.
///
/// Included documents are merged in order, then the file's own keys are merged
/// on top, so a file always overrides what it includes. Mappings merge key by
/// key; any other value is replaced wholesale.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, Box<dyn Error>> {
    process_includes_recursive(path, 0)
}

// Guards against include cycles.
const MAX_INCLUDE_DEPTH: usize = 16;

fn process_includes_recursive(path: &Path, depth: usize) -> Result<Yaml, Box<dyn Error>> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(format!("include depth exceeded at {}", path.display()).into());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|line| line.trim().starts_with(INCLUDE_DIRECTIVE));

    let mut merged_includes: Option<Yaml> = None;
    for line in includes {
        let include_path = line.trim()[INCLUDE_DIRECTIVE.len()..].trim();
        if include_path.is_empty() {
            return Err(format!("empty include in {}", path.display()).into());
        }
        let included = process_includes_recursive(&base_path.join(include_path), depth + 1)?;
        merged_includes = Some(match merged_includes {
            Some(acc) => merge_yaml(&acc, &included),
            None => included,
        });
    }

    let own = YamlLoader::load_from_str(&rest.join("\n"))?
        .into_iter()
        .reduce(|acc, doc| merge_yaml(&acc, &doc));

    match (merged_includes, own) {
        (Some(base), Some(own)) => Ok(merge_yaml(&base, &own)),
        (Some(base), None) => Ok(base),
        (None, Some(own)) => Ok(own),
        (None, None) => Err(format!("{} is empty", path.display()).into()),
    }
}

fn merge_yaml(base: &Yaml, override_yaml: &Yaml) -> Yaml {
    match (base, override_yaml) {
        (Yaml::Hash(base_hash), Yaml::Hash(override_hash)) => {
            let mut result = base_hash.clone();
            for (key, value) in override_hash {
                let merged = match base_hash.get(key) {
                    Some(base_value) => merge_yaml(base_value, value),
                    None => value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Yaml::Hash(result)
        }
        (_, override_value) => override_value.clone(),
    }
}
