// Mirrors `CREATE_TABLES` in `db`.

diesel::table! {
    customers (id) {
        id -> Integer,
        name -> Text,
        car_model -> Text,
        vin -> Text,
        issue -> Nullable<Text>,
        date_added -> Nullable<Text>,
    }
}

diesel::table! {
    inventory (id) {
        id -> Integer,
        part_name -> Text,
        quantity -> Integer,
        price -> Double,
        supplier -> Nullable<Text>,
        last_ordered -> Nullable<Text>,
    }
}

diesel::table! {
    login_logs (id) {
        id -> Integer,
        username -> Nullable<Text>,
        role -> Nullable<Text>,
        login_time -> Nullable<Text>,
    }
}

diesel::table! {
    repairs (id) {
        id -> Integer,
        vehicle -> Text,
        customer_name -> Text,
        car_model -> Text,
        vin -> Text,
        issue -> Nullable<Text>,
        status -> Text,
        start_date -> Nullable<Text>,
        assigned_mechanic -> Nullable<Text>,
        priority -> Nullable<Text>,
        estimated_hours -> Nullable<Double>,
        estimated_cost -> Nullable<Double>,
        end_date -> Nullable<Text>,
    }
}

diesel::table! {
    schedules (id) {
        id -> Integer,
        mechanic -> Text,
        start_time -> Text,
        end_time -> Text,
        task -> Nullable<Text>,
        status -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        password -> Text,
        role -> Text,
        full_name -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    customers,
    inventory,
    login_logs,
    repairs,
    schedules,
    users,
);
