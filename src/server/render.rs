//! Server-side rendering of the form shell.
//!
//! Produces the full HTML document for one request: the localized form
//! markup, the embedded CAPTCHA widget, a `<noscript>` fallback, and the
//! three serialized globals the client half hydrates from. Render failures
//! degrade to a minimal static error page rather than a blank response.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::boot::{
    BootContext, INITIAL_DATA_GLOBAL, PERFORMANCE_CONFIG_GLOBAL, RENDER_TIME_GLOBAL,
};
use crate::config::PerformanceConfig;
use crate::i18n::{translate, Locale};

/// Failures while producing the shell.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize injected state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Render the complete document. `widget_markup` comes from the configured
/// challenge provider; `started` anchors the injected render-time
/// diagnostic.
pub fn render_page(
    boot: &BootContext,
    performance: &PerformanceConfig,
    widget_markup: &str,
    started: Instant,
) -> Result<String, RenderError> {
    let locale = boot.locale;
    let form = render_form(boot, widget_markup);
    let initial_json = embed_json(boot)?;
    let performance_json = embed_json(performance)?;
    let render_time_ms = started.elapsed().as_millis();

    Ok(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"{lang}\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n\
         <meta name=\"description\" content=\"{subtitle}\">\n\
         <style>\n\
         body {{ margin: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; }}\n\
         .verification-form {{ max-width: 480px; margin: 40px auto; padding: 0 16px; }}\n\
         .form-field {{ margin-bottom: 16px; display: flex; flex-direction: column; }}\n\
         .form-field label {{ margin-bottom: 4px; font-weight: 600; }}\n\
         </style>\n\
         <script>\n\
         window.{initial_global} = {initial_json};\n\
         window.{performance_global} = {performance_json};\n\
         window.{render_time_global} = {render_time_ms};\n\
         </script>\n\
         </head>\n\
         <body>\n\
         <div id=\"root\">{form}</div>\n\
         <noscript>\n\
         <div class=\"noscript-fallback\">\n\
         <h2>{noscript_title}</h2>\n\
         <p>{noscript_message}</p>\n\
         </div>\n\
         </noscript>\n\
         </body>\n\
         </html>\n",
        lang = locale.as_str(),
        title = translate(locale, "form.title"),
        subtitle = translate(locale, "form.subtitle"),
        initial_global = INITIAL_DATA_GLOBAL,
        performance_global = PERFORMANCE_CONFIG_GLOBAL,
        render_time_global = RENDER_TIME_GLOBAL,
        initial_json = initial_json,
        performance_json = performance_json,
        render_time_ms = render_time_ms,
        form = form,
        noscript_title = translate(locale, "noscript.title"),
        noscript_message = translate(locale, "noscript.message"),
    ))
}

/// Markup for the form itself, hydrated client-side.
fn render_form(boot: &BootContext, widget_markup: &str) -> String {
    let locale = boot.locale;
    let mut options = String::new();
    for country in &boot.countries {
        let selected = if country.code == boot.country {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            "<option value=\"{code}\"{selected}>{flag} {name}</option>",
            code = attr(&country.code),
            flag = country.flag,
            name = text(&country.name),
        ));
    }

    format!(
        "<form class=\"verification-form\" method=\"post\" action=\"/api/verification/submit\">\n\
         <h1>{title}</h1>\n\
         <p>{subtitle}</p>\n\
         <div class=\"form-field\">\n\
         <label for=\"name\">{name_label}</label>\n\
         <input id=\"name\" name=\"name\" type=\"text\" placeholder=\"{name_placeholder}\" required>\n\
         </div>\n\
         <div class=\"form-field\">\n\
         <label for=\"country\">{country_label}</label>\n\
         <select id=\"country\" name=\"country\" required>\n\
         <option value=\"\">{country_placeholder}</option>{options}\n\
         </select>\n\
         </div>\n\
         <div class=\"form-field\">\n\
         <label for=\"address\">{address_label}</label>\n\
         <input id=\"address\" name=\"address\" type=\"text\" placeholder=\"{address_placeholder}\" required>\n\
         </div>\n\
         <div class=\"form-field\">{widget}</div>\n\
         <button type=\"submit\">{submit}</button>\n\
         </form>",
        title = translate(locale, "form.title"),
        subtitle = translate(locale, "form.subtitle"),
        name_label = translate(locale, "form.fields.name.label"),
        name_placeholder = attr(translate(locale, "form.fields.name.placeholder")),
        country_label = translate(locale, "form.fields.country.label"),
        country_placeholder = text(translate(locale, "form.fields.country.placeholder")),
        options = options,
        address_label = translate(locale, "form.fields.address.label"),
        address_placeholder = attr(translate(locale, "form.fields.address.placeholder")),
        widget = widget_markup,
        submit = translate(locale, "form.submit"),
    )
}

/// Static fallback shown when the render pipeline itself fails.
pub fn render_error_page(locale: Locale) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"{lang}\">\n\
         <head><meta charset=\"UTF-8\"><title>{title}</title></head>\n\
         <body>\n\
         <div style=\"padding: 20px; text-align: center;\">\n\
         <h2>{title}</h2>\n\
         <p>{message}</p>\n\
         <button onclick=\"window.location.reload()\">{retry}</button>\n\
         </div>\n\
         </body>\n\
         </html>\n",
        lang = locale.as_str(),
        title = translate(locale, "error.title"),
        message = translate(locale, "error.message"),
        retry = translate(locale, "error.retry"),
    )
}

// Embedded JSON must not be able to close the surrounding script tag.
fn embed_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

fn text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::{read_document, BootContextBuilder};
    use scraper::{Html, Selector};

    fn rendered(locale: Locale, country: &str) -> String {
        let boot = BootContextBuilder::new(locale, country).build();
        render_page(
            &boot,
            &PerformanceConfig::default(),
            "<div class=\"g-recaptcha\" data-sitekey=\"k\"></div>",
            Instant::now(),
        )
        .unwrap()
    }

    #[test]
    fn page_sets_lang_and_localized_title() {
        let page = rendered(Locale::PtBr, "BR");
        assert!(page.contains("<html lang=\"pt-BR\">"));
        assert!(page.contains("Verificação de dados"));
        assert!(page.contains("<noscript>"));
    }

    #[test]
    fn form_preselects_the_request_country() {
        let page = rendered(Locale::EsAr, "AR");
        let document = Html::parse_document(&page);
        let selector = Selector::parse("option[selected]").unwrap();
        let selected: Vec<_> = document.select(&selector).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value().attr("value"), Some("AR"));
    }

    #[test]
    fn injected_globals_hydrate_back() {
        let page = rendered(Locale::EsAr, "AR");
        let state = read_document(&page).unwrap();
        assert_eq!(state.initial.locale, Locale::EsAr);
        assert_eq!(state.initial.country, "AR");
        assert_eq!(state.performance, PerformanceConfig::default());
        assert!(state.render_time_ms.is_some());
    }

    #[test]
    fn widget_markup_is_embedded() {
        let page = rendered(Locale::EsAr, "AR");
        assert!(page.contains("data-sitekey=\"k\""));
    }

    #[test]
    fn error_page_offers_reload() {
        let page = render_error_page(Locale::PtBr);
        assert!(page.contains("window.location.reload()"));
        assert!(page.contains("Erro temporário"));
    }
}
