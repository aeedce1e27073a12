//! Bounded JSON emission for command responses.
//!
//! Reports are rendered into fixed-capacity buffers. A field or list
//! element that would overflow the capacity is dropped whole: earlier
//! bytes are never touched and [`JsonObject::finish`] always closes the
//! value, so a truncated report is still well-formed JSON. String values
//! are escaped; keys are fixed scheme literals and are written verbatim.
//!
//! Not a general-purpose serializer: only the flat object and
//! array-of-fragments shapes used by the reports are supported.

/// Fixed-capacity writer for one JSON object.
pub struct JsonObject {
    buf: String,
    capacity: usize,
    truncated: bool,
    fields: usize,
}

impl JsonObject {
    /// Start an object with the given byte capacity (at least `{}`).
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = String::new();
        buf.push('{');
        Self {
            buf,
            capacity: capacity.max(2),
            truncated: false,
            fields: 0,
        }
    }

    fn key_prefix(&self, key: &str) -> String {
        if self.fields > 0 {
            format!(",\"{key}\":")
        } else {
            format!("\"{key}\":")
        }
    }

    /// Append a complete fragment if it fits alongside `closing` reserved
    /// bytes. Once a fragment is dropped the writer stops accepting more,
    /// keeping the emitted prefix stable.
    fn try_push(&mut self, fragment: &str, closing: usize) -> bool {
        if self.truncated {
            return false;
        }
        if self.buf.len() + fragment.len() + closing > self.capacity {
            self.truncated = true;
            return false;
        }
        self.buf.push_str(fragment);
        true
    }

    pub fn bool_field(&mut self, key: &str, value: bool) -> &mut Self {
        let fragment = format!(
            "{}{}",
            self.key_prefix(key),
            if value { "true" } else { "false" }
        );
        if self.try_push(&fragment, 1) {
            self.fields += 1;
        }
        self
    }

    pub fn int_field(&mut self, key: &str, value: i64) -> &mut Self {
        let fragment = format!("{}{}", self.key_prefix(key), value);
        if self.try_push(&fragment, 1) {
            self.fields += 1;
        }
        self
    }

    pub fn str_field(&mut self, key: &str, value: &str) -> &mut Self {
        let mut fragment = self.key_prefix(key);
        fragment.push('"');
        escape_into(&mut fragment, value);
        fragment.push('"');
        if self.try_push(&fragment, 1) {
            self.fields += 1;
        }
        self
    }

    /// Array field of pre-rendered JSON fragments. Elements are appended
    /// in order until one does not fit; the tail is dropped whole and the
    /// array still closes.
    pub fn list_field<I>(&mut self, key: &str, items: I) -> &mut Self
    where
        I: IntoIterator<Item = String>,
    {
        if self.truncated {
            return self;
        }
        let open = format!("{}[", self.key_prefix(key));
        // Room for the opener plus "]" and the object's "}".
        if self.buf.len() + open.len() + 2 > self.capacity {
            self.truncated = true;
            return self;
        }
        self.buf.push_str(&open);
        let mut first = true;
        for item in items {
            let separator = if first { "" } else { "," };
            let needed = separator.len() + item.len() + 2;
            if self.buf.len() + needed > self.capacity {
                self.truncated = true;
                break;
            }
            self.buf.push_str(separator);
            self.buf.push_str(&item);
            first = false;
        }
        self.buf.push(']');
        self.fields += 1;
        self
    }

    /// Whether any field or element was dropped for lack of space.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Close the object and return the rendered JSON.
    pub fn finish(mut self) -> String {
        self.buf.push('}');
        self.buf
    }
}

/// Append `value` to `out` with JSON string escaping.
pub fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if (ch as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", ch as u32));
            }
            ch => out.push(ch),
        }
    }
}
