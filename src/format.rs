/// Render an integer with commas between groups of three digits.
pub fn format_with_commas(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if n < 0 {
        out.push('-');
    }

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

#[test]
fn test_format_with_commas() {
    let tests = vec![
        (0, "0"),
        (7, "7"),
        (999, "999"),
        (1000, "1,000"),
        (65_536, "65,536"),
        (100_000, "100,000"),
        (1_234_567, "1,234,567"),
        (-1_234, "-1,234"),
        (-999, "-999"),
        (i64::MIN, "-9,223,372,036,854,775,808"),
    ];

    for (n, exp) in tests.into_iter() {
        assert_eq!(format_with_commas(n), exp);
    }
}
