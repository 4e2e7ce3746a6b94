use std::borrow::Cow;

/// Alias definitions, kept in the order they were created.
#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    entries: Vec<(String, String)>,
}

impl AliasTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&str> {
        let name = name.as_ref();
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, command)| command.as_str())
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.get(name).is_some()
    }

    /// Adds a new alias. Returns `false` and leaves the table untouched if
    /// `name` is already defined.
    pub fn insert<S1, S2>(&mut self, name: S1, command: S2) -> bool
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, command.into()));
        true
    }

    pub fn remove<T: AsRef<str>>(&mut self, name: T) -> Option<String> {
        let name = name.as_ref();
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, command)| (name.as_str(), command.as_str()))
    }

    /// Substitutes the first word of a trimmed `line` if it names an alias.
    /// Expansion is single-pass: the substituted text is not expanded again.
    pub fn expand<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let first = match line.split_whitespace().next() {
            Some(first) => first,
            None => return Cow::Borrowed(line),
        };

        match self.get(first) {
            Some(command) if line.starts_with(first) => {
                Cow::Owned(format!("{}{}", command, &line[first.len()..]))
            }
            _ => Cow::Borrowed(line),
        }
    }
}
