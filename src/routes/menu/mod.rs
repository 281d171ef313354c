mod handler;
mod model;

pub use handler::{
    create_menu_item, delete_menu_item, get_menu_item, list_menu_items, update_menu_item,
};
pub use model::{
    CreateMenuItemRequest, MENU_CACHE_NAMESPACE, MenuItem, MenuItemQuery, UpdateMenuItemRequest,
};
