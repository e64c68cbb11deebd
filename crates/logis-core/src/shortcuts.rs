/// A canned question the front end can send with one keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickQuery {
    pub icon: &'static str,
    pub text: &'static str,
}

pub const QUICK_QUERIES: [QuickQuery; 6] = [
    QuickQuery { icon: "▣", text: "¿Hay stock de elaion f50 5w-40 4l?" },
    QuickQuery { icon: "△", text: "¿Qué productos están agotados?" },
    QuickQuery { icon: "▤", text: "Mostrar alertas de stock" },
    QuickQuery { icon: "$", text: "¿Cuánto vale en total mi inventario?" },
    QuickQuery { icon: "↘", text: "¿Qué productos críticos debería reponer primero?" },
    QuickQuery { icon: "$", text: "Dame los 5 productos más caros" },
];

/// How many quick queries the welcome panel offers.
pub const WELCOME_QUERIES: usize = 4;

pub const PRODUCT_LINES: [&str; 5] = ["Lubricantes", "Químicos", "GLP", "Filtros", "Accesorios"];

pub fn welcome_queries() -> &'static [QuickQuery] {
    &QUICK_QUERIES[..WELCOME_QUERIES]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_offers_the_first_four() {
        let welcome = welcome_queries();
        assert_eq!(welcome.len(), 4);
        assert_eq!(welcome[0].text, "¿Hay stock de elaion f50 5w-40 4l?");
        assert_eq!(welcome[3].text, "¿Cuánto vale en total mi inventario?");
    }

    #[test]
    fn quick_queries_are_already_trimmed() {
        for query in QUICK_QUERIES {
            assert_eq!(query.text, query.text.trim());
            assert!(!query.text.is_empty());
        }
    }
}
