//! Field rule catalog for Russian freight contract-requests
//! ("Договор-заявка").
//!
//! Every rule is an independent regex evaluated against the whole document
//! text with multiline and dot-matches-newline semantics. Capture group 1 of
//! the first match is the field value.

use lazy_static::lazy_static;
use regex::Regex;

/// Section label that introduces the carrier's requisites.
pub const CARRIER_SECTION: &str = "Перевозчик:";

/// One named extraction rule.
#[derive(Debug)]
pub struct FieldRule {
    /// Semantic field name used as the output key.
    pub field: &'static str,
    pattern: Regex,
    /// Value used when the pattern does not match.
    pub default: &'static str,
    /// Section label the rule belongs to, when scoping is enabled the rule
    /// only sees text after this label.
    pub section: Option<&'static str>,
    /// Captured text is cut before the first line starting with this prefix.
    pub until_line: Option<&'static str>,
}

impl FieldRule {
    fn new(field: &'static str, pattern: &str) -> Self {
        Self {
            field,
            pattern: Regex::new(&format!("(?ms){pattern}")).unwrap(),
            default: "",
            section: None,
            until_line: None,
        }
    }

    fn in_section(mut self, label: &'static str) -> Self {
        self.section = Some(label);
        self
    }

    fn until_line(mut self, prefix: &'static str) -> Self {
        self.until_line = Some(prefix);
        self
    }

    /// Apply the rule to `text`, falling back to the default.
    pub fn apply(&self, text: &str) -> String {
        self.find(text).unwrap_or_else(|| self.default.to_string())
    }

    /// Apply the rule, returning `None` when nothing matched.
    pub fn find(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let mut value = caps.get(1)?.as_str();
        if let Some(prefix) = self.until_line {
            let stop = format!("\n{prefix}");
            if let Some(pos) = value.find(&stop) {
                value = &value[..pos];
            }
        }
        Some(value.trim().to_string())
    }

    /// The regex source without the flag prefix.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str().trim_start_matches("(?ms)")
    }
}

lazy_static! {
    /// The ordered rule catalog.
    pub static ref FIELD_RULES: Vec<FieldRule> = vec![
        // Document header
        FieldRule::new("number", r"Договор[–-]заявка\s*№\s*([^\s]+)"),
        FieldRule::new("date", r"от\s+(\d{2}\.\d{2}\.\d{4})"),

        // Customer requisites
        FieldRule::new("customerName", r"Заказчик:\s*([^\n]+?)(?:\s+Перевозчик:|\n)"),
        FieldRule::new("customerInn", r"ИНН\s+(\d{10,12})"),
        FieldRule::new("customerOgrn", r"ОГРН[:\s]+(\d{13,15})"),
        FieldRule::new("customerOkpo", r"ОКПО[:\s]+(\d+)"),
        FieldRule::new("customerOkvd", r"ОКВД[:\s]+([\d.]+)"),
        FieldRule::new("customerAccount", r"Расчетный счет[:\s]+(\d+)"),
        FieldRule::new("customerBank", r"Наименование банка[:\s]+([^\n]+)"),
        FieldRule::new("customerBik", r"БИК[:\s]+(\d+)"),
        FieldRule::new("customerCorAccount", r"Корр\.?\s*счет[:\s]+(\d+)"),
        FieldRule::new("customerDirector", r"Генеральный директор\s+([^\n]+)"),
        FieldRule::new("customerAddress", r"адрес[:\s]+([^\n]+?)(?:\s+ОКВД:|\n)"),

        // Carrier requisites
        FieldRule::new("carrierName", r"Перевозчик:\s*([^\n]+)"),
        FieldRule::new("carrierInn", r"Перевозчик:.*?ИНН\s+(\d{10,12})"),
        FieldRule::new("carrierOgrn", r"ОГРНИП[:\s№]+([^\n]+)").in_section(CARRIER_SECTION),
        FieldRule::new("carrierAccount", r"р/с\s+([\d.]+)").in_section(CARRIER_SECTION),
        FieldRule::new("carrierBank", r"(?:БИК|Банк)[:\s]+([^\n]+?)(?:\s+к/с|\n)")
            .in_section(CARRIER_SECTION),
        FieldRule::new("carrierAddress", r"(?:юр\.|почт\.)\s*адрес[:\s]+([^\n]+)")
            .in_section(CARRIER_SECTION),
        FieldRule::new("carrierEmail", r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})")
            .in_section(CARRIER_SECTION),

        // Cargo
        FieldRule::new("bodyType", r"Требуемый тип ТС:\s*([^\n]+?)(?:\s+рефрижератор|\n)"),
        FieldRule::new("cargoType", r"(?:тип кузова\s+)?([рР]ефрижератор)"),
        FieldRule::new("weight", r"(\d+)\s*т\.?(?:\s|$)"),
        FieldRule::new("volume", r"(\d+)\s*м3"),
        FieldRule::new("specialConditions", r"Особые условия:\s*([^\n]+)"),
        FieldRule::new("extraConditions", r"\+\s*(\d+\s*град)"),
        FieldRule::new("cargoName", r"Груз:\s*([^\n]+)"),

        // Loading and unloading
        FieldRule::new("loadingAddress", r"Погрузка:\s*([^\n]+?)(?:\s+дата|\n)"),
        FieldRule::new("loadingDate", r"Погрузка:.*?(\d{2}\.\d{2}\.\d{4})"),
        FieldRule::new("loadingContact", r"контактное лицо[:\s]+([^\n]+?)(?:\s+Разгрузка:|\n)"),
        FieldRule::new("unloadingAddress", r"Разгрузка:\s*([^\n]+?)(?:\s+дата|\n)"),
        FieldRule::new("unloadingDate", r"Разгрузка:.*?(\d{2}\.\d{2}\.\d{4})"),
        FieldRule::new("unloadingContact", r"Разгрузка:.*?контактное лицо[:\s]+([^\n]+)"),

        // Payment
        FieldRule::new("amount", r"Оплата:\s*([\d\s]+)\s*руб"),
        FieldRule::new("paymentTerms", r"(без НДС)"),
        FieldRule::new("paymentConditions", r"(\d+-\d+\s*б/д)"),

        // Driver
        FieldRule::new("driverName", r"Данные водителя:\s*([А-ЯЁа-яё\s]+?)(?:\s+паспорт|\n)"),
        FieldRule::new("driverPassport", r"паспорт[:\s]+([^\n]+)"),
        FieldRule::new("driverLicense", r"ВУ\s+([^\n]+)"),

        // Vehicle
        FieldRule::new("vehicleModel", r"Данные ТС:\s*([^\n]+?)(?:\s+прицеп|\n)"),
        FieldRule::new("vehicleNumber", r"([А-Я]\d{3}[А-Я]{2}/\d{2})"),
        FieldRule::new("trailerNumber", r"прицеп\s+([^\n]+)"),

        FieldRule::new("transportConditions", r"Условия перевозки:\s*([^\n]+(?:\n[^\n]+)*)")
            .until_line("Штрафные"),
    ];
}

/// Names of all catalog fields, in catalog order.
pub fn field_names() -> impl Iterator<Item = &'static str> {
    FIELD_RULES.iter().map(|rule| rule.field)
}

/// Look up a rule by field name.
pub fn rule(field: &str) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|rule| rule.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_field_names_unique() {
        let names: HashSet<_> = field_names().collect();
        assert_eq!(names.len(), FIELD_RULES.len());
        assert_eq!(FIELD_RULES.len(), 43);
    }

    #[test]
    fn test_only_carrier_identity_rules_are_sectioned() {
        let sectioned: Vec<_> = FIELD_RULES
            .iter()
            .filter(|r| r.section.is_some())
            .map(|r| r.field)
            .collect();
        assert_eq!(
            sectioned,
            vec!["carrierOgrn", "carrierAccount", "carrierBank", "carrierAddress", "carrierEmail"]
        );
    }

    #[test]
    fn test_transport_conditions_stop_at_penalties() {
        let text = "Условия перевозки: груз закрепить\nтемпература +4\nШтрафные санкции: 5000\n";
        let value = rule("transportConditions").unwrap().apply(text);
        assert_eq!(value, "груз закрепить\nтемпература +4");
    }

    #[test]
    fn test_transport_conditions_stop_at_blank_line() {
        let text = "Условия перевозки: пломба\n\nДругое";
        assert_eq!(rule("transportConditions").unwrap().apply(text), "пломба");
    }

    #[test]
    fn test_number_accepts_both_dashes() {
        let rule = rule("number").unwrap();
        assert_eq!(rule.apply("Договор-заявка № 145/12 от 01.12.2025"), "145/12");
        assert_eq!(rule.apply("Договор–заявка №77"), "77");
    }

    #[test]
    fn test_vehicle_plate() {
        let rule = rule("vehicleNumber").unwrap();
        assert_eq!(rule.apply("Данные ТС: Volvo А123ВС/77 прицеп ЕР1234/77"), "А123ВС/77");
    }

    #[test]
    fn test_pattern_source_is_exposed_without_flags() {
        assert_eq!(rule("volume").unwrap().pattern(), r"(\d+)\s*м3");
    }
}
