//! Label form state: the three text fields plus the barcode value.
//! `price` is derived from unit price × weight and has no setter.

use crate::lookup::BarcodeOption;

/// The four values a label is composed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFields {
    pub unit_price: String,
    pub weight: String,
    pub price: String,
    pub barcode_value: String,
}

impl LabelFields {
    /// Build fields from raw input, deriving `price`.
    pub fn new(unit_price: &str, weight: &str, barcode_value: &str) -> Self {
        let mut form = LabelForm::default();
        form.set_unit_price(unit_price);
        form.set_weight(weight);
        form.set_barcode_value(barcode_value);
        form.into_fields()
    }

    /// First empty field that blocks export, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("unit price", &self.unit_price),
            ("weight", &self.weight),
            ("barcode value", &self.barcode_value),
            ("price", &self.price),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Download trigger guard.
    pub fn can_export(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Value strings in label order: unit price, weight, price.
    pub fn value_row(&self) -> [String; 3] {
        [
            format!("{}/kg", self.unit_price),
            format!("{} kg", self.weight),
            self.price.clone(),
        ]
    }

    /// Like `value_row`, with "N/A" standing in for empty fields.
    pub fn preview_row(&self) -> [String; 3] {
        let or_na = |v: &str, s: String| if v.is_empty() { "N/A".to_string() } else { s };
        let [unit, weight, price] = self.value_row();
        [
            or_na(&self.unit_price, unit),
            or_na(&self.weight, weight),
            or_na(&self.price, price),
        ]
    }
}

/// Holder of user input; recomputes `price` on every unit price / weight change.
#[derive(Debug, Clone, Default)]
pub struct LabelForm {
    fields: LabelFields,
}

impl LabelForm {
    pub fn fields(&self) -> &LabelFields {
        &self.fields
    }

    pub fn into_fields(self) -> LabelFields {
        self.fields
    }

    pub fn set_unit_price(&mut self, v: &str) {
        self.fields.unit_price = v.trim().to_string();
        self.recompute();
    }

    pub fn set_weight(&mut self, v: &str) {
        self.fields.weight = v.trim().to_string();
        self.recompute();
    }

    pub fn set_barcode_value(&mut self, v: &str) {
        self.fields.barcode_value = v.trim().to_string();
    }

    /// Use a looked-up candidate as the barcode value.
    pub fn select_option(&mut self, opt: &BarcodeOption) {
        self.set_barcode_value(&opt.value);
    }

    pub fn can_export(&self) -> bool {
        self.fields.can_export()
    }

    fn recompute(&mut self) {
        self.fields.price =
            compute_price(&self.fields.unit_price, &self.fields.weight).unwrap_or_default();
    }
}

/// `round(unit_price × weight, 2)` formatted with two decimals, or `None`
/// when either side is missing or not a finite decimal.
pub fn compute_price(unit_price: &str, weight: &str) -> Option<String> {
    let u = parse_decimal(unit_price)?;
    let w = parse_decimal(weight)?;
    let cents = (u * w * 100.0).round(); // ties away from zero
    if !cents.is_finite() {
        return None;
    }
    Some(format!("{:.2}", cents / 100.0))
}

fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
