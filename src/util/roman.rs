/// Roman numeral for a collection tier, as shown in game.
pub fn roman_numeral(mut value: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    if value == 0 {
        return "0".to_string();
    }

    let mut out = String::new();
    for (amount, glyph) in TABLE {
        while value >= amount {
            out.push_str(glyph);
            value -= amount;
        }
    }
    out
}
