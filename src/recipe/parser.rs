// src/recipe/parser.rs

//! Recipe file parsing
//!
//! `build_rom.ini` is a flat list of `key=value` lines:
//!
//! ```text
//! zip=dkong.zip
//! ifiles=(c_5et_g.bin c_5ct_g.bin "with space.bin" ../extra/patch.bin)
//! ofile=a.dkong.rom
//! ofileMd5sumValid=2f2fa8a8a1a5d9b6b3ae5c08a8a6a7d1
//! ```
//!
//! When the recipe was fetched from a registry source, inputs starting with
//! `../` point at files published next to the recipe and are rewritten into
//! absolute URLs under that source.

use crate::error::{Error, Result};
use crate::recipe::format::{InputSpec, Recipe};
use std::collections::BTreeMap;

pub const KEY_ZIP: &str = "zip";
pub const KEY_INPUTS: &str = "ifiles";
pub const KEY_OUTPUT: &str = "ofile";
pub const KEY_MD5: &str = "ofileMd5sumValid";
pub const KEY_SOURCE_URL: &str = "html_url";

/// Marker for inputs that live beside the recipe rather than in the archive
const RELATIVE_MARKER: &str = "../";

/// Path beneath a source's web location where relative inputs are anchored
const RELEASE_ASSET_PATH: &str = "raw/master/releases/foo";

/// Parse recipe text, optionally anchored at the registry source it came from
pub fn parse_recipe(text: &str, origin: Option<&str>) -> Result<Recipe> {
    let mut archive_name = None;
    let mut output_file = None;
    let mut inputs = None;
    let mut expected_md5 = None;
    let mut attributes = BTreeMap::new();

    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::MalformedRecipe(format!(
                "line {} has no '=' separator: {}",
                lineno + 1,
                line.trim()
            ))
        })?;
        let key = key.trim();
        let value = value.trim();

        match key {
            KEY_ZIP => archive_name = Some(value.to_string()),
            KEY_OUTPUT => output_file = Some(value.to_string()),
            KEY_INPUTS => inputs = Some(parse_input_list(value, origin)?),
            KEY_MD5 => expected_md5 = Some(value.to_lowercase()),
            _ => {
                attributes.insert(key.to_string(), value.to_string());
            }
        }
    }

    let archive_name = require(archive_name, KEY_ZIP)?;
    let inputs = inputs.ok_or_else(|| missing_key(KEY_INPUTS))?;
    if inputs.is_empty() {
        return Err(Error::MalformedRecipe(format!(
            "'{}' lists no input files",
            KEY_INPUTS
        )));
    }

    // An origin always wins over a verbatim html_url attribute
    let source_url = match origin {
        Some(origin) => {
            attributes.remove(KEY_SOURCE_URL);
            Some(origin.to_string())
        }
        None => attributes.remove(KEY_SOURCE_URL),
    };

    Ok(Recipe {
        archive_name,
        output_file: output_file.filter(|ofile: &String| !ofile.is_empty()),
        inputs,
        expected_md5: expected_md5.filter(|md5| !md5.is_empty()),
        source_url,
        attributes,
    })
}

/// Tokenize an `ifiles` value into inputs
///
/// One pair of surrounding parentheses is stripped, the rest is split with
/// shell quoting rules.
pub fn parse_input_list(value: &str, origin: Option<&str>) -> Result<Vec<InputSpec>> {
    let value = value.trim();
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(value);

    let tokens = shlex::split(inner).ok_or_else(|| {
        Error::MalformedRecipe(format!("unbalanced quoting in input list: {}", value))
    })?;

    Ok(tokens
        .iter()
        .map(|token| resolve_token(token, origin))
        .collect())
}

fn resolve_token(token: &str, origin: Option<&str>) -> InputSpec {
    match (origin, token.strip_prefix(RELATIVE_MARKER)) {
        (Some(origin), Some(relative)) => InputSpec::RemoteFile {
            url: format!(
                "{}/{}/{}",
                origin.trim_end_matches('/'),
                RELEASE_ASSET_PATH,
                relative
            ),
        },
        _ => InputSpec::from_token(token),
    }
}

fn require(value: Option<String>, key: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing_key(key))
}

fn missing_key(key: &str) -> Error {
    Error::MalformedRecipe(format!("missing required key '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com/Arcade-Foo_MiSTer";

    fn member(name: &str) -> InputSpec {
        InputSpec::ArchiveMember {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_valid_recipe() {
        let text = "zip=dkong.zip\n\
                    ifiles=(c_5et_g.bin c_5ct_g.bin)\n\
                    ofile=a.dkong.rom\n\
                    ofileMd5sumValid=0123456789ABCDEF0123456789abcdef\n\
                    mameversion=0229\n";

        let recipe = parse_recipe(text, None).unwrap();
        assert_eq!(recipe.key(), "dkong.zip");
        assert_eq!(recipe.output_file.as_deref(), Some("a.dkong.rom"));
        assert_eq!(recipe.inputs, vec![member("c_5et_g.bin"), member("c_5ct_g.bin")]);
        assert_eq!(
            recipe.expected_md5.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(recipe.attributes.get("mameversion").map(String::as_str), Some("0229"));
        assert!(recipe.source_url.is_none());
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let text = "\r\nzip = game.zip \r\n\r\n   \nifiles=a.bin\r\nofile=game.rom\r\n";
        let recipe = parse_recipe(text, None).unwrap();
        assert_eq!(recipe.archive_name, "game.zip");
        assert_eq!(recipe.inputs, vec![member("a.bin")]);
    }

    #[test]
    fn test_line_without_separator() {
        let text = "zip=game.zip\nthis line is broken\nifiles=a.bin\nofile=x.rom";
        let err = parse_recipe(text, None).unwrap_err();
        assert!(matches!(err, Error::MalformedRecipe(ref msg) if msg.contains("line 2")));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let text = "zip=game.zip\nifiles=https://host/get?id=1\nofile=x.rom\nnote=a=b";
        let recipe = parse_recipe(text, None).unwrap();
        assert_eq!(
            recipe.inputs,
            vec![InputSpec::RemoteFile {
                url: "https://host/get?id=1".to_string()
            }]
        );
        assert_eq!(recipe.attributes.get("note").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_quoted_inputs() {
        let text = "zip=g.zip\nifiles=(\"first chip.bin\" 'second chip.bin' third\\ chip.bin)\nofile=g.rom";
        let recipe = parse_recipe(text, None).unwrap();
        assert_eq!(
            recipe.inputs,
            vec![
                member("first chip.bin"),
                member("second chip.bin"),
                member("third chip.bin")
            ]
        );
    }

    #[test]
    fn test_unbalanced_quote() {
        let text = "zip=g.zip\nifiles=(\"broken.bin)\nofile=g.rom";
        assert!(matches!(
            parse_recipe(text, None),
            Err(Error::MalformedRecipe(_))
        ));
    }

    #[test]
    fn test_only_one_paren_pair_stripped() {
        let inputs = parse_input_list("((a.bin))", None).unwrap();
        assert_eq!(inputs, vec![member("(a.bin)")]);

        let inputs = parse_input_list("(a.bin", None).unwrap();
        assert_eq!(inputs, vec![member("(a.bin")]);
    }

    #[test]
    fn test_relative_inputs_rewritten_with_origin() {
        let inputs = parse_input_list("(../roms/chip1.bin chip2.bin)", Some(ORIGIN)).unwrap();
        assert_eq!(
            inputs,
            vec![
                InputSpec::RemoteFile {
                    url: "https://example.com/Arcade-Foo_MiSTer/raw/master/releases/foo/roms/chip1.bin"
                        .to_string()
                },
                member("chip2.bin"),
            ]
        );
    }

    #[test]
    fn test_relative_inputs_kept_without_origin() {
        let inputs = parse_input_list("../roms/chip1.bin chip2.bin", None).unwrap();
        assert_eq!(inputs, vec![member("../roms/chip1.bin"), member("chip2.bin")]);
    }

    #[test]
    fn test_origin_sets_source_url() {
        let text = "zip=g.zip\nifiles=a.bin\nofile=g.rom\nhtml_url=https://elsewhere";
        let recipe = parse_recipe(text, Some(ORIGIN)).unwrap();
        assert_eq!(recipe.source_url.as_deref(), Some(ORIGIN));
        assert!(!recipe.attributes.contains_key(KEY_SOURCE_URL));
    }

    #[test]
    fn test_missing_required_keys() {
        assert!(parse_recipe("ifiles=a.bin\nofile=g.rom", None).is_err());
        assert!(parse_recipe("zip=g.zip\nofile=g.rom", None).is_err());
        assert!(parse_recipe("zip=g.zip\nifiles=()\nofile=g.rom", None).is_err());
    }

    #[test]
    fn test_output_file_is_optional() {
        let recipe = parse_recipe("zip=g.zip\nifiles=a.bin b.bin", None).unwrap();
        assert_eq!(recipe.output_file, None);
        assert_eq!(recipe.inputs.len(), 2);

        let recipe = parse_recipe("zip=g.zip\nifiles=a.bin\nofile=", None).unwrap();
        assert_eq!(recipe.output_file, None);
    }
}
