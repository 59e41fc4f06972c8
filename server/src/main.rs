#[tokio::main]
async fn main() {
    mealping::start_server().await;
}
