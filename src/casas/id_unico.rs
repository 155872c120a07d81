use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use super::repo_types::TipoCasa;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref HYPHENS_RE: Regex = Regex::new(r"-+").unwrap();
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomicilioError {
    #[error("El interior es obligatorio para duplex.")]
    InteriorRequerido,

    #[error("No debes capturar interior para casa.")]
    InteriorNoPermitido,
}

/// Uppercases, strips diacritics and turns whitespace runs into single hyphens.
pub fn normalize_text(value: &str) -> String {
    let upper: String = value
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_diacritic(*c))
        .collect();
    let hyphenated = WHITESPACE_RE.replace_all(&upper, "-");
    HYPHENS_RE.replace_all(&hyphenated, "-").trim().to_string()
}

/// Keeps ASCII digits only.
pub fn normalize_whatsapp(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Derives the household key: `CALLE-NUMERO` for a casa, `CALLE-NUMERO-INTERIOR` for a duplex.
///
/// A blank interior counts as absent. Duplexes must carry one, casas must not.
pub fn generate_id_unico(
    calle: &str,
    numero: &str,
    tipo: TipoCasa,
    interior: Option<&str>,
) -> Result<String, DomicilioError> {
    let interior = interior.map(str::trim).filter(|s| !s.is_empty());
    let base = format!(
        "{}-{}",
        normalize_text(calle.trim()),
        normalize_text(numero.trim())
    );
    match (tipo, interior) {
        (TipoCasa::Casa, None) => Ok(base),
        (TipoCasa::Casa, Some(_)) => Err(DomicilioError::InteriorNoPermitido),
        (TipoCasa::Duplex, Some(interior)) => Ok(format!("{base}-{}", normalize_text(interior))),
        (TipoCasa::Duplex, None) => Err(DomicilioError::InteriorRequerido),
    }
}
