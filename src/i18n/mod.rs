//! Localisation support.
//!
//! Carries the supported locale set, the translated string catalog used by
//! the form and captcha layers, and the detection chain that picks a locale
//! for an incoming request or a hydrating client.

pub mod detector;

pub use detector::{
    DetectionContext, LocaleDetector, MemoryPreferenceStore, PreferenceError, PreferenceStore,
    RedbPreferenceStore, DEFAULT_LOCALE,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language/region tags the microfrontend can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "es-AR")]
    EsAr,
    #[serde(rename = "pt-BR")]
    PtBr,
}

/// All locales the catalog ships strings for.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::EsAr, Locale::PtBr];

impl Locale {
    /// BCP 47 tag for this locale.
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::EsAr => "es-AR",
            Locale::PtBr => "pt-BR",
        }
    }

    /// Country the locale is anchored to.
    pub fn country_code(&self) -> &'static str {
        match self {
            Locale::EsAr => "AR",
            Locale::PtBr => "BR",
        }
    }

    /// Parse an exact supported tag. Unknown tags yield `None`; use the
    /// detector for fuzzy language negotiation.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "es-AR" => Some(Locale::EsAr),
            "pt-BR" => Some(Locale::PtBr),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_tag(s).ok_or_else(|| format!("unsupported locale: {s}"))
    }
}

/// Look up a catalog string for `key` in `locale`.
///
/// Unknown keys fall back to the key itself so missing translations surface
/// in rendered output instead of panicking.
pub fn translate(locale: Locale, key: &str) -> &'static str {
    let text = match locale {
        Locale::EsAr => spanish(key),
        Locale::PtBr => portuguese(key),
    };
    text.unwrap_or_else(|| {
        log::warn!("missing translation for {key} ({locale})");
        leak_key(key)
    })
}

// The fallback must return 'static; untranslated keys are rare and bounded
// by the catalog, so leaking them is acceptable.
fn leak_key(key: &str) -> &'static str {
    Box::leak(key.to_string().into_boxed_str())
}

fn spanish(key: &str) -> Option<&'static str> {
    Some(match key {
        "captcha.errors.notLoaded" => "El CAPTCHA todavía no terminó de cargar",
        "captcha.errors.loadFailed" => "No se pudo cargar el CAPTCHA",
        "captcha.errors.noToken" => "El CAPTCHA no devolvió un token",
        "captcha.errors.executionFailed" => "No se pudo ejecutar el CAPTCHA",
        "captcha.errors.verificationFailed" => "La verificación del CAPTCHA falló",
        "form.validation.name.required" => "El nombre es requerido",
        "form.validation.name.minLength" => "El nombre debe tener al menos 2 caracteres",
        "form.validation.name.maxLength" => "El nombre no puede superar los 100 caracteres",
        "form.validation.name.invalid" => "El nombre solo puede contener letras y espacios",
        "form.validation.country.required" => "Seleccioná un país",
        "form.validation.address.required" => "La dirección es requerida",
        "form.validation.address.minLength" => "La dirección debe tener al menos 10 caracteres",
        "form.validation.address.maxLength" => "La dirección no puede superar los 200 caracteres",
        "form.errors.captchaRequired" => "Completá el CAPTCHA antes de enviar",
        "form.errors.submitFailed" => "No pudimos enviar tus datos. Intentá nuevamente.",
        "form.title" => "Verificación de datos",
        "form.subtitle" => "Confirmá tus datos para continuar con la compra",
        "form.fields.name.label" => "Nombre completo",
        "form.fields.name.placeholder" => "Juan Pérez",
        "form.fields.country.label" => "País",
        "form.fields.country.placeholder" => "Seleccioná tu país",
        "form.fields.address.label" => "Dirección",
        "form.fields.address.placeholder" => "Av. Corrientes 1234, Buenos Aires",
        "form.submit" => "Verificar datos",
        "form.submitting" => "Enviando…",
        "form.success.title" => "Datos verificados",
        "form.success.message" => "Tu información fue verificada correctamente.",
        "error.title" => "Error temporal",
        "error.message" => "Estamos experimentando problemas técnicos. Intentá nuevamente en unos momentos.",
        "error.retry" => "Reintentar",
        "noscript.title" => "Verificación de datos",
        "noscript.message" => "Para continuar, habilitá JavaScript en tu navegador.",
        _ => return None,
    })
}

fn portuguese(key: &str) -> Option<&'static str> {
    Some(match key {
        "captcha.errors.notLoaded" => "O CAPTCHA ainda não terminou de carregar",
        "captcha.errors.loadFailed" => "Não foi possível carregar o CAPTCHA",
        "captcha.errors.noToken" => "O CAPTCHA não retornou um token",
        "captcha.errors.executionFailed" => "Não foi possível executar o CAPTCHA",
        "captcha.errors.verificationFailed" => "A verificação do CAPTCHA falhou",
        "form.validation.name.required" => "O nome é obrigatório",
        "form.validation.name.minLength" => "O nome deve ter pelo menos 2 caracteres",
        "form.validation.name.maxLength" => "O nome não pode ter mais de 100 caracteres",
        "form.validation.name.invalid" => "O nome só pode conter letras e espaços",
        "form.validation.country.required" => "Selecione um país",
        "form.validation.address.required" => "O endereço é obrigatório",
        "form.validation.address.minLength" => "O endereço deve ter pelo menos 10 caracteres",
        "form.validation.address.maxLength" => "O endereço não pode ter mais de 200 caracteres",
        "form.errors.captchaRequired" => "Complete o CAPTCHA antes de enviar",
        "form.errors.submitFailed" => "Não foi possível enviar seus dados. Tente novamente.",
        "form.title" => "Verificação de dados",
        "form.subtitle" => "Confirme seus dados para continuar com a compra",
        "form.fields.name.label" => "Nome completo",
        "form.fields.name.placeholder" => "Maria Silva",
        "form.fields.country.label" => "País",
        "form.fields.country.placeholder" => "Selecione seu país",
        "form.fields.address.label" => "Endereço",
        "form.fields.address.placeholder" => "Rua das Flores 567, São Paulo",
        "form.submit" => "Verificar dados",
        "form.submitting" => "Enviando…",
        "form.success.title" => "Dados verificados",
        "form.success.message" => "Suas informações foram verificadas com sucesso.",
        "error.title" => "Erro temporário",
        "error.message" => "Estamos com problemas técnicos. Tente novamente em alguns instantes.",
        "error.retry" => "Tentar novamente",
        "noscript.title" => "Verificação de dados",
        "noscript.message" => "Para continuar, habilite o JavaScript no seu navegador.",
        _ => return None,
    })
}
