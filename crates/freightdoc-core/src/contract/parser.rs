//! Contract parser driving the field rule catalog.

use tracing::{debug, trace};

use crate::models::config::ExtractionConfig;
use crate::models::contract::FieldMapping;

use super::rules::{FieldRule, FIELD_RULES};
use super::ContractExtractor;

/// Result of contract extraction with diagnostics.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted fields, every catalog key present.
    pub fields: FieldMapping,
    /// Fields that fell back to their default.
    pub unmatched: Vec<&'static str>,
}

impl ExtractionResult {
    /// Number of fields a rule actually matched.
    pub fn matched(&self) -> usize {
        self.fields.len() - self.unmatched.len()
    }
}

/// Rule-based contract parser.
#[derive(Debug, Clone, Default)]
pub struct ContractParser {
    /// Restrict sectioned rules to the text after their section label.
    scope_sections: bool,
}

impl ContractParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_scoped_carrier_fields(config.scope_carrier_fields)
    }

    /// Set whether carrier identity rules only see the carrier section.
    pub fn with_scoped_carrier_fields(mut self, scoped: bool) -> Self {
        self.scope_sections = scoped;
        self
    }

    /// Run every rule over `text`.
    pub fn parse(&self, text: &str) -> ExtractionResult {
        let mut fields = FieldMapping::new();
        let mut unmatched = Vec::new();

        for rule in FIELD_RULES.iter() {
            let value = match self.rule_text(rule, text).and_then(|scope| rule.find(scope)) {
                Some(value) => {
                    trace!("{} = {:?}", rule.field, value);
                    value
                }
                None => {
                    unmatched.push(rule.field);
                    rule.default.to_string()
                }
            };
            fields.insert(rule.field.to_string(), value);
        }

        debug!(
            "Contract extraction: {}/{} fields matched",
            fields.len() - unmatched.len(),
            fields.len()
        );

        ExtractionResult { fields, unmatched }
    }

    /// The slice of `text` a rule is evaluated against.
    fn rule_text<'t>(&self, rule: &FieldRule, text: &'t str) -> Option<&'t str> {
        match rule.section {
            Some(label) if self.scope_sections => {
                text.find(label).map(|pos| &text[pos + label.len()..])
            }
            _ => Some(text),
        }
    }
}

impl ContractExtractor for ContractParser {
    fn extract_fields(&self, text: &str) -> FieldMapping {
        self.parse(text).fields
    }
}

/// Extract contract fields with the default parser.
pub fn extract_contract_fields(full_text: &str) -> FieldMapping {
    ContractParser::new().extract_fields(full_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::rules::{field_names, FIELD_RULES};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
Договор-заявка № 118 от 18.12.2025
Заказчик: ООО Ромашка
ИНН 7707083893
ОГРН: 1027700132195
ОКПО: 12345678
юридический адрес: г. Москва, ул. Ленина, 1 ОКВД: 49.41
Расчетный счет: 40702810900000012345
Наименование банка: ПАО Сбербанк
БИК: 044525225
Корр. счет: 30101810400000000225
Генеральный директор Иванов И.И.
Перевозчик: ИП Шильков А.В.
ИНН 183100123456
ОГРНИП: № 320183200012345
р/с 40802810168000012345
Банк: АО Тинькофф к/с 30101810145250000974
юр. адрес: г. Ижевск, ул. Мира, 5
e-mail: shilkov@example.ru
Требуемый тип ТС: 20 т. 82 м3 рефрижератор
Особые условия: режим +4 град
Груз: лук репчатый
Погрузка: г. Москва, ул. Складская, 3 дата 19.12.2025 контактное лицо: Петров
Разгрузка: с. Шабердино дата 20.12.2025 контактное лицо: Сидоров
Оплата: 85 000 руб без НДС 5-7 б/д
Данные водителя: Шильков Андрей Викторович паспорт 9415 123456
ВУ 18 12 345678
Данные ТС: Volvo FH А123ВС/18 прицеп ВА1234/18
Условия перевозки: пломбировка обязательна
температурный режим соблюдать
Штрафные санкции: по договору
";

    #[test]
    fn test_customer_name_and_inn() {
        let fields = extract_contract_fields("Заказчик: ООО Ромашка\nИНН 7707083893");
        assert_eq!(fields["customerName"], "ООО Ромашка");
        assert_eq!(fields["customerInn"], "7707083893");
    }

    #[test]
    fn test_no_labels_yields_defaults() {
        let fields = extract_contract_fields("Lorem ipsum dolor sit amet");
        assert_eq!(fields.len(), FIELD_RULES.len());
        for name in field_names() {
            assert_eq!(fields[name], "", "field {name} should be empty");
        }
    }

    #[test]
    fn test_empty_text_yields_complete_mapping() {
        let result = ContractParser::new().parse("");
        assert_eq!(result.fields.len(), FIELD_RULES.len());
        assert_eq!(result.unmatched.len(), FIELD_RULES.len());
        assert_eq!(result.matched(), 0);
    }

    #[test]
    fn test_idempotent() {
        let parser = ContractParser::new();
        let first = serde_json::to_string(&parser.extract_fields(SAMPLE)).unwrap();
        let second = serde_json::to_string(&parser.extract_fields(SAMPLE)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_contract() {
        let fields = extract_contract_fields(SAMPLE);

        assert_eq!(fields["number"], "118");
        assert_eq!(fields["date"], "18.12.2025");
        assert_eq!(fields["customerName"], "ООО Ромашка");
        assert_eq!(fields["customerInn"], "7707083893");
        assert_eq!(fields["customerOgrn"], "1027700132195");
        assert_eq!(fields["customerOkpo"], "12345678");
        assert_eq!(fields["customerOkvd"], "49.41");
        assert_eq!(fields["customerAddress"], "г. Москва, ул. Ленина, 1");
        assert_eq!(fields["customerAccount"], "40702810900000012345");
        assert_eq!(fields["customerBank"], "ПАО Сбербанк");
        assert_eq!(fields["customerBik"], "044525225");
        assert_eq!(fields["customerCorAccount"], "30101810400000000225");
        assert_eq!(fields["customerDirector"], "Иванов И.И.");

        assert_eq!(fields["carrierName"], "ИП Шильков А.В.");
        assert_eq!(fields["carrierInn"], "183100123456");
        assert_eq!(fields["carrierOgrn"], "320183200012345");
        assert_eq!(fields["carrierAccount"], "40802810168000012345");
        assert_eq!(fields["carrierAddress"], "г. Ижевск, ул. Мира, 5");
        assert_eq!(fields["carrierEmail"], "shilkov@example.ru");

        assert_eq!(fields["bodyType"], "20 т. 82 м3");
        assert_eq!(fields["cargoType"], "рефрижератор");
        assert_eq!(fields["weight"], "20");
        assert_eq!(fields["volume"], "82");
        assert_eq!(fields["specialConditions"], "режим +4 град");
        assert_eq!(fields["extraConditions"], "4 град");
        assert_eq!(fields["cargoName"], "лук репчатый");

        assert_eq!(fields["loadingAddress"], "г. Москва, ул. Складская, 3");
        assert_eq!(fields["loadingDate"], "19.12.2025");
        assert_eq!(fields["loadingContact"], "Петров");
        assert_eq!(fields["unloadingAddress"], "с. Шабердино");
        assert_eq!(fields["unloadingDate"], "20.12.2025");
        assert_eq!(fields["unloadingContact"], "Сидоров");

        assert_eq!(fields["amount"], "85 000");
        assert_eq!(fields["paymentTerms"], "без НДС");
        assert_eq!(fields["paymentConditions"], "5-7 б/д");

        assert_eq!(fields["driverName"], "Шильков Андрей Викторович");
        assert_eq!(fields["driverPassport"], "9415 123456");
        assert_eq!(fields["driverLicense"], "18 12 345678");

        assert_eq!(fields["vehicleModel"], "Volvo FH А123ВС/18");
        assert_eq!(fields["vehicleNumber"], "А123ВС/18");
        assert_eq!(fields["trailerNumber"], "ВА1234/18");

        assert_eq!(
            fields["transportConditions"],
            "пломбировка обязательна\nтемпературный режим соблюдать"
        );
    }

    #[test]
    fn test_unscoped_bik_bleeds_from_customer_side() {
        let text = "Заказчик: ООО Ромашка\nБИК: 044525225\nПеревозчик: ИП Шильков\nБанк: АО Тинькофф\n";
        let fields = extract_contract_fields(text);
        // first БИК/Банк label in the document wins
        assert_eq!(fields["carrierBank"], "044525225");
    }

    #[test]
    fn test_scoped_carrier_fields() {
        let text = "Заказчик: ООО Ромашка\nБИК: 044525225\nпочта: zakaz@romashka.ru\n\
                    Перевозчик: ИП Шильков\nБанк: АО Тинькофф\n";
        let parser = ContractParser::new().with_scoped_carrier_fields(true);
        let fields = parser.extract_fields(text);
        assert_eq!(fields["carrierBank"], "АО Тинькофф");
        assert_eq!(fields["carrierEmail"], "");
        // unsectioned rules still see the whole document
        assert_eq!(fields["customerBik"], "044525225");
    }

    #[test]
    fn test_scoped_fields_default_without_section() {
        let parser = ContractParser::new().with_scoped_carrier_fields(true);
        let fields = parser.extract_fields("р/с 40802810168000012345\n");
        assert_eq!(fields["carrierAccount"], "");
        let fields = ContractParser::new().extract_fields("р/с 40802810168000012345\n");
        assert_eq!(fields["carrierAccount"], "40802810168000012345");
    }
}
