use encoding_rs::Encoding;

/// Resolves an encoding label (caller override or file-declared name).
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return None;
    }

    Encoding::for_label_no_replacement(trimmed.as_bytes()).or_else(|| {
        let lower = trimmed.to_ascii_lowercase();
        Encoding::for_label_no_replacement(lower.replace('_', "-").as_bytes())
            .or_else(|| legacy_alias(&lower))
            .or_else(|| mac_compat_encoding(&lower))
    })
}

/// Strips trailing space, NUL and tab bytes from a text cell.
pub fn trim_trailing(bytes: &[u8]) -> &[u8] {
    match bytes
        .iter()
        .rposition(|b| !matches!(*b, b' ' | 0 | b'\t'))
    {
        Some(last) => &bytes[..=last],
        None => &[],
    }
}

/// Cuts a header string at its first NUL and trims surrounding whitespace.
pub fn nul_terminated(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    bytes[..end].trim_ascii()
}

fn legacy_alias(lower_label: &str) -> Option<&'static Encoding> {
    let label: &[u8] = match lower_label {
        "x-windows-iso2022jp" => b"iso-2022-jp",
        "x-ibm949" | "x-windows-949" | "cp949" => b"euc-kr",
        "x-windows-950" | "cp950" => b"big5",
        "windows-936" => b"gbk",
        "shift_jisx0213" | "cp932" => b"shift_jis",
        "us-ascii" => b"windows-1252",
        "cp874" => b"windows-874",
        "big-5" => b"big5",
        _ => return None,
    };
    Encoding::for_label(label)
}

fn mac_compat_encoding(lower_label: &str) -> Option<&'static Encoding> {
    let name = lower_label
        .strip_prefix("x-mac-")
        .or_else(|| lower_label.strip_prefix("x-mac"))
        .or_else(|| lower_label.strip_prefix("mac"))?;
    let label: &[u8] = match name {
        "roman" => b"macintosh",
        "arabic" => b"x-mac-arabic",
        "hebrew" => b"x-mac-hebrew",
        "greek" => b"x-mac-greek",
        "thai" => b"x-mac-thai",
        "turkish" => b"x-mac-turkish",
        "ukraine" | "ukrainian" => b"x-mac-ukrainian",
        "iceland" | "icelandic" => b"x-mac-icelandic",
        "croatian" => b"x-mac-croatian",
        "cyrillic" => b"x-mac-cyrillic",
        "romania" | "romanian" => b"x-mac-romanian",
        _ => return None,
    };
    Encoding::for_label(label)
}

/// Maps the encoding byte stored in the file header to a character-set name.
pub const fn lookup_encoding(code: u8) -> Option<&'static str> {
    static ENCODING_MAP: &[(u8, &str)] = &[
        (0, "WINDOWS-1252"),
        (20, "UTF-8"),
        (28, "US-ASCII"),
        (29, "ISO-8859-1"),
        (30, "ISO-8859-2"),
        (31, "ISO-8859-3"),
        (32, "ISO-8859-4"),
        (33, "ISO-8859-5"),
        (34, "ISO-8859-6"),
        (35, "ISO-8859-7"),
        (36, "ISO-8859-8"),
        (37, "ISO-8859-9"),
        (39, "ISO-8859-11"),
        (40, "ISO-8859-15"),
        (41, "CP437"),
        (42, "CP850"),
        (43, "CP852"),
        (44, "CP857"),
        (45, "CP858"),
        (46, "CP862"),
        (47, "CP864"),
        (48, "CP865"),
        (49, "CP866"),
        (50, "CP869"),
        (51, "CP874"),
        (60, "WINDOWS-1250"),
        (61, "WINDOWS-1251"),
        (62, "WINDOWS-1252"),
        (63, "WINDOWS-1253"),
        (64, "WINDOWS-1254"),
        (65, "WINDOWS-1255"),
        (66, "WINDOWS-1256"),
        (67, "WINDOWS-1257"),
        (68, "WINDOWS-1258"),
        (69, "MACROMAN"),
        (70, "MACARABIC"),
        (71, "MACHEBREW"),
        (72, "MACGREEK"),
        (73, "MACTHAI"),
        (75, "MACTURKISH"),
        (76, "MACUKRAINE"),
        (118, "CP950"),
        (119, "EUC-TW"),
        (123, "BIG-5"),
        (125, "GB18030"),
        (126, "WINDOWS-936"),
        (134, "EUC-JP"),
        (136, "CP949"),
        (138, "CP932"),
        (140, "EUC-KR"),
        (141, "CP949"),
        (142, "CP949"),
        (163, "MACICELAND"),
        (167, "ISO-2022-JP"),
        (168, "ISO-2022-KR"),
        (204, "WINDOWS-1252"),
        (205, "GB18030"),
        (227, "ISO-8859-14"),
        (242, "ISO-8859-13"),
        (245, "MACCROATIAN"),
        (246, "MACCYRILLIC"),
        (247, "MACROMANIA"),
        (248, "SHIFT_JISX0213"),
    ];

    let mut i = 0usize;
    while i < ENCODING_MAP.len() {
        if ENCODING_MAP[i].0 == code {
            return Some(ENCODING_MAP[i].1);
        }
        i += 1;
    }
    None
}
