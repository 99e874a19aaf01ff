//! Client-side hydration reader.
//!
//! The inverse of the render pipeline's injection step: given the
//! server-rendered document, pull the serialized globals back out and
//! deserialize them into the same structures the server assembled. Keeping
//! this a pure function of the document (rather than ambient global reads)
//! lets the hydration path be tested against real rendered output.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::PerformanceConfig;

use super::{
    BootContext, BootGlobals, INITIAL_DATA_GLOBAL, PERFORMANCE_CONFIG_GLOBAL, RENDER_TIME_GLOBAL,
};

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("static selector"));

/// Result of reading a rendered document.
pub type HydratedState = BootGlobals;

/// Failures while reading injected globals out of a document.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("injected global {0} not found in document")]
    MissingGlobal(&'static str),
    #[error("injected global {global} is malformed: {source}")]
    Malformed {
        global: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the boot globals from a rendered HTML document.
///
/// The render pipeline emits each global as a single
/// `window.__NAME__ = <json>;` line inside a script element; this reader
/// accepts any script in the document that matches that shape.
pub fn read_document(html: &str) -> Result<HydratedState, HydrationError> {
    let document = Html::parse_document(html);
    let mut scripts = String::new();
    for script in document.select(&SCRIPT_SELECTOR) {
        scripts.push_str(&script.text().collect::<String>());
        scripts.push('\n');
    }

    let initial: BootContext = required_global(&scripts, INITIAL_DATA_GLOBAL)?;
    let performance: PerformanceConfig = required_global(&scripts, PERFORMANCE_CONFIG_GLOBAL)?;
    let render_time_ms: Option<u64> = optional_global(&scripts, RENDER_TIME_GLOBAL)?;

    Ok(HydratedState {
        initial,
        performance,
        render_time_ms,
    })
}

fn required_global<T: DeserializeOwned>(
    scripts: &str,
    name: &'static str,
) -> Result<T, HydrationError> {
    optional_global(scripts, name)?.ok_or(HydrationError::MissingGlobal(name))
}

fn optional_global<T: DeserializeOwned>(
    scripts: &str,
    name: &'static str,
) -> Result<Option<T>, HydrationError> {
    let pattern = Regex::new(&format!(
        r"window\.{}\s*=\s*(.+?);\s*(?:\r?\n|$)",
        regex::escape(name)
    ))
    .expect("static global pattern");

    let Some(captures) = pattern.captures(scripts) else {
        return Ok(None);
    };
    serde_json::from_str(&captures[1])
        .map(Some)
        .map_err(|source| HydrationError::Malformed {
            global: name,
            source,
        })
}
