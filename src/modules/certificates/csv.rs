//! Minimal RFC 4180 writer for the certificate export.

use crate::domain::{format_brazilian_datetime, format_cpf};
use crate::modules::registrations::handlers::RegistrationView;

const HEADER: [&str; 8] = [
    "Nome",
    "CPF",
    "E-mail",
    "Telefone",
    "Instituição",
    "Inscrito em",
    "Frequência (%)",
    "Certificado emitido",
];

/// Leading characters spreadsheets read as the start of a formula.
const FORMULA_PREFIXES: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

fn escape_field(field: &str) -> String {
    // Participant-typed text must open as text, never as a formula.
    let field = if field.starts_with(FORMULA_PREFIXES) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let row: Vec<String> = fields.into_iter().map(escape_field).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Render participants as CSV. Starts with a UTF-8 BOM so spreadsheet tools
/// pick the right encoding for accented names.
pub fn render(participants: &[RegistrationView]) -> String {
    let mut out = String::from('\u{feff}');
    push_row(&mut out, HEADER);

    for view in participants {
        let registration = &view.registration;
        let cpf = format_cpf(registration.cpf.as_str());
        let registered_at = format_brazilian_datetime(registration.registered_at);
        let percent = view.eligibility.percent.to_string();
        let issued = if registration.certificate_issued { "sim" } else { "não" };

        push_row(
            &mut out,
            [
                registration.name.as_str(),
                cpf.as_str(),
                registration.email.as_str(),
                registration.phone.as_str(),
                registration.institution.as_str(),
                registered_at.as_str(),
                percent.as_str(),
                issued,
            ],
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field_quotes_only_when_needed() {
        assert_eq!(escape_field("Ana"), "Ana");
        assert_eq!(escape_field("Silva, Ana"), "\"Silva, Ana\"");
        assert_eq!(escape_field("o \"Bia\""), "\"o \"\"Bia\"\"\"");
    }

    #[test]
    fn test_formula_cells_are_neutralized() {
        assert_eq!(escape_field("=HYPERLINK(\"http://x\")"), "\"'=HYPERLINK(\"\"http://x\"\")\"");
        assert_eq!(escape_field("+5511999"), "'+5511999");
        assert_eq!(escape_field("-1"), "'-1");
        assert_eq!(escape_field("@SUM(A1)"), "'@SUM(A1)");
        assert_eq!(escape_field("Ana-Maria"), "Ana-Maria");
    }

    #[test]
    fn test_render_empty_has_header_only() {
        let csv = render(&[]);
        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.contains("Frequência (%)"));
    }
}
