/// Convenient macro for constructing a [`Value::Map`][crate::Value].
///
/// Keys are identifiers or string literals. Values are nested maps `{..}`,
/// lists `[..]`, `None`, or any expression implementing `Into<Value>`.
///
/// ```
/// let data = dustr::value! {
///     user: { name: "John", age: 42 },
///     "page-title": "Home",
///     items: [1, 2, None],
/// };
/// ```
#[macro_export]
macro_rules! value {
    ($($tt:tt)*) => {
        $crate::_value!({ $($tt)* })
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value {
    (None) => {
        $crate::Value::None
    };

    ([ $($tt:tt)* ]) => {
        $crate::Value::List($crate::_value_list!([] $($tt)*))
    };

    ({ $($tt:tt)* }) => {
        $crate::Value::Map({
            #[allow(unused_mut)]
            let mut map = $crate::Map::new();
            $crate::_value_map!(map; $($tt)*);
            map
        })
    };

    // Default to `From` implementation.
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value_list {
    ([ $($out:expr,)* ]) => {
        ::std::vec![$($out),*]
    };

    ([ $($out:expr,)* ] None $(, $($rest:tt)*)?) => {
        $crate::_value_list!([ $($out,)* $crate::Value::None, ] $($($rest)*)?)
    };

    ([ $($out:expr,)* ] [ $($v:tt)* ] $(, $($rest:tt)*)?) => {
        $crate::_value_list!([ $($out,)* $crate::_value!([ $($v)* ]), ] $($($rest)*)?)
    };

    ([ $($out:expr,)* ] { $($v:tt)* } $(, $($rest:tt)*)?) => {
        $crate::_value_list!([ $($out,)* $crate::_value!({ $($v)* }), ] $($($rest)*)?)
    };

    ([ $($out:expr,)* ] $v:expr $(, $($rest:tt)*)?) => {
        $crate::_value_list!([ $($out,)* $crate::Value::from($v), ] $($($rest)*)?)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value_map {
    ($map:ident;) => {};

    ($map:ident; $key:tt : None $(, $($rest:tt)*)?) => {
        $map.insert($crate::_value_key!($key), $crate::Value::None);
        $crate::_value_map!($map; $($($rest)*)?);
    };

    ($map:ident; $key:tt : [ $($v:tt)* ] $(, $($rest:tt)*)?) => {
        $map.insert($crate::_value_key!($key), $crate::_value!([ $($v)* ]));
        $crate::_value_map!($map; $($($rest)*)?);
    };

    ($map:ident; $key:tt : { $($v:tt)* } $(, $($rest:tt)*)?) => {
        $map.insert($crate::_value_key!($key), $crate::_value!({ $($v)* }));
        $crate::_value_map!($map; $($($rest)*)?);
    };

    ($map:ident; $key:tt : $v:expr $(, $($rest:tt)*)?) => {
        $map.insert($crate::_value_key!($key), $crate::Value::from($v));
        $crate::_value_map!($map; $($($rest)*)?);
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value_key {
    ($key:ident) => {
        ::std::string::String::from(stringify!($key))
    };

    ($key:literal) => {
        ::std::string::String::from($key)
    };
}

#[cfg(test)]
mod tests {
    use crate::value::{List, Map};
    use crate::Value;

    #[test]
    fn value_empty() {
        assert_eq!(value! {}, Value::Map(Map::new()));
    }

    #[test]
    fn value_list() {
        let v = value! { x: ["testing...", None, {}, [], 1 + 1] };
        let exp = Value::Map(Map::from([(
            "x".to_owned(),
            Value::List(vec![
                Value::from("testing..."),
                Value::None,
                Value::Map(Map::new()),
                Value::List(List::new()),
                Value::Integer(2),
            ]),
        )]));
        assert_eq!(v, exp);
    }

    #[test]
    fn value_map_nested() {
        let v = value! {
            w: "hello",
            "x-y": {
                y: String::from("hello"),
                z: None,
            },
        };
        let exp = Value::Map(Map::from([
            ("w".to_owned(), Value::from("hello")),
            (
                "x-y".to_owned(),
                Value::Map(Map::from([
                    ("y".to_owned(), Value::from("hello")),
                    ("z".to_owned(), Value::None),
                ])),
            ),
        ]));
        assert_eq!(v, exp);
    }
}
