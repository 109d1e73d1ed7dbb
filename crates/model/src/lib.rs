pub mod catalog;

pub mod core {
    pub mod data_type;
    pub mod identifiers;
    pub mod value;
}

pub mod pagination {
    pub mod cursor;
    pub mod position;
}

pub mod records {
    pub mod change;
    pub mod output;
}
