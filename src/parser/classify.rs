use std::fmt;

/// An enumerated on-disk code with a total lookup from its raw form.
pub trait WireCode: Sized + Copy {
    type Raw: Clone + Eq + fmt::Debug;

    /// Looks the raw code up in the table; `None` when absent.
    fn from_raw(raw: Self::Raw) -> Option<Self>;

    /// The raw code written for this value.
    fn raw(self) -> Self::Raw;
}

/// Known-or-raw representation of a wire code.
///
/// Codes absent from their lookup table are kept verbatim as `Unknown`; whether
/// that is fatal is the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified<T: WireCode> {
    Known(T),
    Unknown(T::Raw),
}

impl<T> Copy for Classified<T>
where
    T: WireCode,
    T::Raw: Copy,
{
}

impl<T: WireCode> Classified<T> {
    #[must_use]
    pub fn classify(raw: T::Raw) -> Self {
        match T::from_raw(raw.clone()) {
            Some(value) => Self::Known(value),
            None => Self::Unknown(raw),
        }
    }

    #[must_use]
    pub fn raw(&self) -> T::Raw {
        match self {
            Self::Known(value) => value.raw(),
            Self::Unknown(raw) => raw.clone(),
        }
    }

    #[must_use]
    pub fn known(&self) -> Option<T> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl<T: WireCode> From<T> for Classified<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}
