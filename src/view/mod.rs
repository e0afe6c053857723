//! View-layer state and decisions. Rendering is left to the embedding UI;
//! these types hold what it reads and the actions it triggers.

pub mod car_details;
pub mod filter;
pub mod navbar;
pub mod order_form;
pub mod routes;

pub use car_details::CarDetailsController;
pub use filter::CarFilter;
pub use navbar::{build_menu, MenuAction, MenuItem};
pub use order_form::OrderForm;
pub use routes::{guard, Access, GuardDecision, Page};

/// Whole-tenge price with thousands grouped by spaces, e.g. `1 250 000 ₸`.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    let sign = if price < 0 { "-" } else { "" };
    format!("{}{} ₸", sign, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0 ₸");
        assert_eq!(format_price(999), "999 ₸");
        assert_eq!(format_price(1000), "1 000 ₸");
        assert_eq!(format_price(12_500_000), "12 500 000 ₸");
        assert_eq!(format_price(-45_000), "-45 000 ₸");
    }
}
