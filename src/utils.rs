use std::path::{Path, PathBuf};

pub const MAX_COLUMN: u32 = 16_384;

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

/// Inverse of [`column_number_to_name`]; `None` for anything that is not a
/// run of ASCII letters naming a column inside the sheet limits.
pub fn column_name_to_number(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let mut column = 0u32;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        column = column.checked_mul(26)?.checked_add(digit)?;
    }
    (column <= MAX_COLUMN).then_some(column)
}

pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

/// Parses an A1-style address into `(column, row)`, both 1-based.
pub fn parse_cell_address(address: &str) -> Option<(u32, u32)> {
    let address = address.trim().trim_start_matches('$');
    let split_idx = address.find(|c: char| c.is_ascii_digit())?;
    let (col_str, row_str) = address.split_at(split_idx);
    let column = column_name_to_number(col_str.trim_end_matches('$'))?;
    let row = row_str.parse::<u32>().ok().filter(|row| *row > 0)?;
    Some((column, row))
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Turns a purpose label into something safe to embed in a file name.
pub fn sanitize_file_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "group".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<dir>/<stem>_<label>.ids` for a base output path such as `matrix.ids`.
pub fn group_output_path(base: &Path, label: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "specifications".to_string());
    let file_name = format!("{}_{}.ids", stem, sanitize_file_label(label));
    match base.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
