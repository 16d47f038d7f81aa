// Locale handling for amounts shared by the engine and the CLI.

/// European/Spanish number and currency format handling.
pub mod euro_format {
    /// Parses an amount that may come in European form ("1.234,56"),
    /// comma-decimal form ("123,45") or plain form ("1234.56"). A currency
    /// symbol and whitespace are stripped first. Empty or unparseable input
    /// yields 0.0; this never fails.
    pub fn parse_amount(s: &str) -> f64 {
        let clean: String = s.chars().filter(|c| *c != '€' && !c.is_whitespace()).collect();
        if clean.is_empty() {
            return 0.0;
        }
        let normalized = if clean.contains('.') && clean.contains(',') {
            // Thousands dots plus decimal comma.
            clean.replace('.', "").replace(',', ".")
        } else if clean.contains(',') {
            clean.replace(',', ".")
        } else {
            clean
        };
        normalized.parse::<f64>().unwrap_or(0.0)
    }

    /// Formats an amount as Spanish-locale euros: "1.234,56 €".
    pub fn format_eur(amount: f64) -> String {
        let mut fixed = format!("{:.2}", amount);
        if fixed == "-0.00" {
            fixed = "0.00".to_string();
        }
        let negative = fixed.starts_with('-');
        let unsigned = fixed.trim_start_matches('-');
        let (int_part, dec_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

        let mut grouped = String::new();
        for (i, c) in int_part.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        let grouped: String = grouped.chars().rev().collect();

        let sign = if negative { "-" } else { "" };
        format!("{sign}{grouped},{dec_part} €")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_amount_european() {
            assert_eq!(parse_amount("1.234,56"), 1234.56);
            assert_eq!(parse_amount("600.822.115,84"), 600822115.84);
        }

        #[test]
        fn test_parse_amount_comma_decimal() {
            assert_eq!(parse_amount("123,45"), 123.45);
        }

        #[test]
        fn test_parse_amount_plain() {
            assert_eq!(parse_amount("1234.56"), 1234.56);
            assert_eq!(parse_amount("42"), 42.0);
        }

        #[test]
        fn test_parse_amount_strips_symbol_and_spaces() {
            assert_eq!(parse_amount(" 1.500,00 € "), 1500.0);
            assert_eq!(parse_amount("€250"), 250.0);
        }

        #[test]
        fn test_parse_amount_garbage_is_zero() {
            assert_eq!(parse_amount(""), 0.0);
            assert_eq!(parse_amount("   "), 0.0);
            assert_eq!(parse_amount("n/a"), 0.0);
        }

        #[test]
        fn test_format_eur_grouping() {
            assert_eq!(format_eur(1234.56), "1.234,56 €");
            assert_eq!(format_eur(1000000.0), "1.000.000,00 €");
            assert_eq!(format_eur(999.9), "999,90 €");
        }

        #[test]
        fn test_format_eur_negative() {
            assert_eq!(format_eur(-1000.5), "-1.000,50 €");
        }

        #[test]
        fn test_format_eur_negative_zero_normalized() {
            assert_eq!(format_eur(-0.001), "0,00 €");
        }
    }
}
