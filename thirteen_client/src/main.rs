use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use thirteen_core::{Card, ClientMessage, LobbyId, ServerMessage};

fn format_hand(hand: &[Card]) -> String {
    hand.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse("ws://127.0.0.1:25913/ws").unwrap();

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await.expect("无法连接");
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        // 手牌单独整理成一行，其余消息直接打印
                        Ok(ServerMessage::GameStarted { hand }) => {
                            println!("\n<-- [发牌] 你的手牌: {}", format_hand(&hand));
                        }
                        Ok(ServerMessage::Hand { hand }) => {
                            println!("\n<-- [手牌] {}", format_hand(&hand));
                        }
                        Ok(server_msg) => {
                            println!("\n<-- [服务器消息]:\n{:#?}\n", server_msg);
                        }
                        Err(e) => eprintln!("解析服务器消息失败: {}", e),
                    }
                    print!("> "); // 重新显示输入提示符
                    std::io::stdout().flush().unwrap();
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 十三张客户端 ---");
    println!("可用命令:");
    println!("  name <昵称>               - 设置昵称");
    println!("  list                      - 查看房间列表");
    println!("  create                    - 创建一个新房间");
    println!("  join <房间ID>             - 加入一个房间");
    println!("  start                     - 开始对局 (仅房主)");
    println!("  back                      - 返回等待大厅 (仅房主)");
    println!("  play <牌...>              - 出牌，如: play 3s 3c 3d");
    println!("  pass                      - 过牌");
    println!("  ready                     - 确认再来一局");
    println!("  leave                     - 离开房间");
    println!("  exit                      - 退出");

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let line = stdin.next_line().await?.unwrap_or_default();
        let parts: Vec<&str> = line.trim().split_whitespace().collect();
        let command = parts.get(0).cloned();

        let client_msg = match command {
            Some("name") => {
                if parts.len() < 2 {
                    println!("用法: name <昵称>");
                    continue;
                }
                Some(ClientMessage::SetName(parts[1..].join(" ")))
            }
            Some("list") => Some(ClientMessage::ListLobbies),
            Some("create") => Some(ClientMessage::CreateLobby),
            Some("join") => {
                if parts.len() < 2 {
                    println!("用法: join <房间ID>");
                    continue;
                }
                let lobby_id: LobbyId = parts[1].parse().expect("无效的房间ID格式");
                Some(ClientMessage::JoinLobby { lobby_id })
            }
            Some("start") => Some(ClientMessage::StartGame),
            Some("back") => Some(ClientMessage::ReturnToLobby),
            Some("play") => {
                if parts.len() < 2 {
                    println!("用法: play <牌...>，例如 play 3s 3c 3d");
                    continue;
                }
                match parts[1..].iter().map(|p| p.parse::<Card>()).collect::<Result<Vec<_>, _>>()
                {
                    Ok(cards) => Some(ClientMessage::Play { cards }),
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                }
            }
            Some("pass") => Some(ClientMessage::Pass),
            Some("ready") => Some(ClientMessage::Ready),
            Some("leave") => Some(ClientMessage::LeaveLobby),
            Some("exit") => {
                println!("正在断开连接...");
                break;
            }
            _ => {
                println!("未知命令: {}", line);
                continue;
            }
        };

        if let Some(msg) = client_msg {
            let payload = serde_json::to_string(&msg)?;
            write.send(Message::Text(payload.into())).await?;
        }
    }

    Ok(())
}
