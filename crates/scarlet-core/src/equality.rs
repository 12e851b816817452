//! Change detection for element values.
//!
//! [`ElementEq::any_eq`] is full equality. [`ElementEq::element_eq`] is the
//! same comparison with dynamic properties ([`State`](crate::State),
//! [`Environment`](crate::Environment)) treated as always equal; nodes use it
//! to decide whether an element must be re-derived.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

pub use scarlet_macros::ElementEq;

pub trait ElementEq {
    fn any_eq(&self, other: &Self) -> bool;

    fn element_eq(&self, other: &Self) -> bool {
        self.any_eq(other)
    }
}

/// Implements [`ElementEq`] through `PartialEq` for plain value types.
#[macro_export]
macro_rules! impl_element_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::ElementEq for $ty {
                #[inline]
                fn any_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_element_eq_by_value!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
    std::any::TypeId,
    std::time::Duration,
);

impl<T: ElementEq + ?Sized> ElementEq for Box<T> {
    fn any_eq(&self, other: &Self) -> bool {
        (**self).any_eq(&**other)
    }

    fn element_eq(&self, other: &Self) -> bool {
        (**self).element_eq(&**other)
    }
}

// Reference types compare by identity.
impl<T: ?Sized> ElementEq for Rc<T> {
    fn any_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> ElementEq for Arc<T> {
    fn any_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ElementEq + ToOwned + ?Sized> ElementEq for Cow<'static, T> {
    fn any_eq(&self, other: &Self) -> bool {
        (**self).any_eq(&**other)
    }
}

impl ElementEq for str {
    fn any_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: ElementEq> ElementEq for Option<T> {
    fn any_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.any_eq(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn element_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.element_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ElementEq> ElementEq for [T] {
    fn any_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.any_eq(b))
    }

    fn element_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.element_eq(b))
    }
}

impl<T: ElementEq> ElementEq for Vec<T> {
    fn any_eq(&self, other: &Self) -> bool {
        self.as_slice().any_eq(other.as_slice())
    }

    fn element_eq(&self, other: &Self) -> bool {
        self.as_slice().element_eq(other.as_slice())
    }
}

impl<T: ElementEq, const N: usize> ElementEq for [T; N] {
    fn any_eq(&self, other: &Self) -> bool {
        self.as_slice().any_eq(other.as_slice())
    }

    fn element_eq(&self, other: &Self) -> bool {
        self.as_slice().element_eq(other.as_slice())
    }
}

macro_rules! impl_element_eq_for_tuple {
    ($($name:ident: $index:tt),+) => {
        impl<$($name: ElementEq),+> ElementEq for ($($name,)+) {
            fn any_eq(&self, other: &Self) -> bool {
                $(self.$index.any_eq(&other.$index))&&+
            }

            fn element_eq(&self, other: &Self) -> bool {
                $(self.$index.element_eq(&other.$index))&&+
            }
        }
    };
}

impl_element_eq_for_tuple!(A: 0);
impl_element_eq_for_tuple!(A: 0, B: 1);
impl_element_eq_for_tuple!(A: 0, B: 1, C: 2);
impl_element_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_element_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_element_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_element_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_element_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Function-valued element field. Never equal to anything, itself included,
/// so an element holding one is always re-derived.
pub struct Callback<A = (), R = ()> {
    function: Rc<dyn Fn(A) -> R>,
}

impl<A, R> Callback<A, R> {
    pub fn new(function: impl Fn(A) -> R + 'static) -> Self {
        Self {
            function: Rc::new(function),
        }
    }

    pub fn call(&self, argument: A) -> R {
        (self.function)(argument)
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self {
            function: Rc::clone(&self.function),
        }
    }
}

impl<A, R> ElementEq for Callback<A, R> {
    fn any_eq(&self, _other: &Self) -> bool {
        false
    }
}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Bitwise comparison backing `#[scarlet(pod)]`.
#[doc(hidden)]
#[inline]
pub fn pod_eq<T: bytemuck::NoUninit>(a: &T, b: &T) -> bool {
    bytemuck::bytes_of(a) == bytemuck::bytes_of(b)
}
